use async_trait::async_trait;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::core::config::{resolve_api_key, Config};
use crate::core::error::RemoteError;
use crate::core::state::{GenerationResult, Source};

pub use crate::core::config::{GeminiConfig, LlmConfig, OllamaConfig, OpenAIConfig};

/// Which model a request should run on. Chapters use the stronger model,
/// short helper prompts the faster one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Chapter,
    Utility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tier: ModelTier,
    /// Ask the service to ground the answer with web search citations.
    pub grounding: bool,
}

impl GenerationRequest {
    pub fn chapter(prompt: impl Into<String>, grounding: bool) -> Self {
        Self {
            prompt: prompt.into(),
            tier: ModelTier::Chapter,
            grounding,
        }
    }

    pub fn utility(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tier: ModelTier::Utility,
            grounding: false,
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub trait LlmBounds: Debug {}
#[cfg(target_arch = "wasm32")]
impl<T: Debug> LlmBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait LlmBounds: Send + Sync + Debug {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + Debug> LlmBounds for T {}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait LlmClient: LlmBounds {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, RemoteError>;
}

pub fn create_llm(config: &Config) -> Result<Box<dyn LlmClient>> {
    match config.llm.provider.as_str() {
        "gemini" => {
            let cfg = config.llm.gemini.as_ref().context("Gemini config missing")?;
            let api_key = resolve_api_key(&cfg.api_key, &["GEMINI_API_KEY", "API_KEY"])
                .context("Gemini API key missing (set llm.gemini.api_key or GEMINI_API_KEY)")?;
            Ok(Box::new(GeminiClient::new(&api_key, &cfg.model, &cfg.utility_model)))
        },
        "ollama" => {
            let cfg = config.llm.ollama.as_ref().context("Ollama config missing")?;
            Ok(Box::new(OllamaClient::new(&cfg.base_url, &cfg.model)))
        },
        "openai" => {
            let cfg = config.llm.openai.as_ref().context("OpenAI config missing")?;
            let api_key = resolve_api_key(&cfg.api_key, &["OPENAI_API_KEY"])
                .context("OpenAI API key missing (set llm.openai.api_key or OPENAI_API_KEY)")?;
            let utility_model = cfg.utility_model.as_deref().unwrap_or(&cfg.model);
            Ok(Box::new(OpenAIClient::new(&api_key, &cfg.model, utility_model, cfg.base_url.as_deref())))
        },
        _ => Err(anyhow!("Unknown LLM provider: {}", config.llm.provider))
    }
}

fn transport_error(provider: &str, err: reqwest::Error) -> RemoteError {
    let message = format!("{} request failed: {}", provider, err);
    match err.status() {
        Some(status) => RemoteError::from_status(status.as_u16(), message),
        None => RemoteError::permanent(message),
    }
}

// --- Gemini ---

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    utility_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, utility_model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            utility_model: utility_model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Chapter => &self.model,
            ModelTier::Utility => &self.utility_model,
        }
    }

    fn endpoint(&self, tier: ModelTier) -> Result<url::Url, RemoteError> {
        let mut url = url::Url::parse(GEMINI_ENDPOINT)
            .and_then(|base| base.join(&format!("./{}:generateContent", self.model_for(tier))))
            .map_err(|e| RemoteError::permanent(format!("Invalid Gemini endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiTool {
    #[serde(rename = "googleSearch")]
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<GroundingWeb>,
}

#[derive(Deserialize)]
struct GroundingWeb {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorWrapper {
    error: GeminiError,
}

/// Web citations with a usable URI, titled by the URI when the service
/// sent none.
fn grounding_sources(metadata: Option<&GroundingMetadata>) -> Vec<Source> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };
    metadata
        .grounding_chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(uri);
            Some(Source::Web {
                uri: uri.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

fn parse_gemini_response(body: &str, grounding: bool) -> Result<GenerationResult, RemoteError> {
    let result: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        RemoteError::permanent(format!("Failed to parse Gemini response: {}. Body: {}", e, body))
    })?;

    if let Some(err) = result.error {
        return Err(RemoteError::classify(format!("Gemini API returned error: {}", err.message)));
    }

    let first = result
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| {
            RemoteError::permanent(format!("Gemini response format unexpected or empty. Body: {}", body))
        })?;

    let text: String = first
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(RemoteError::permanent(format!("Gemini response empty. Finish reason: {}", reason)));
    }

    let sources = if grounding {
        grounding_sources(first.grounding_metadata.as_ref())
    } else {
        Vec::new()
    };

    Ok(GenerationResult { text, sources })
}

fn gemini_http_error(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<GeminiErrorWrapper>(body)
        .map(|wrapper| match wrapper.error.status {
            Some(status_text) if !status_text.is_empty() => {
                format!("{}: {}", status_text, wrapper.error.message)
            }
            _ => wrapper.error.message,
        })
        .unwrap_or_else(|_| body.to_string());
    RemoteError::from_status(status, format!("Gemini API error: {}", message))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, RemoteError> {
        let url = self.endpoint(request.tier)?;

        let mut tools = Vec::new();
        if request.grounding {
            tools.push(GeminiTool { google_search: GoogleSearch {} });
        }
        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: request.prompt.clone() }],
            }],
            tools,
        };

        log::debug!(
            "Gemini request: model={} grounding={} prompt_chars={}",
            self.model_for(request.tier),
            request.grounding,
            request.prompt.chars().count()
        );

        let resp = self.client.post(url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;

        let status = resp.status();
        let response_text = resp.text().await.map_err(|e| transport_error("Gemini", e))?;

        if !status.is_success() {
            return Err(gemini_http_error(status.as_u16(), &response_text));
        }

        parse_gemini_response(&response_text, request.grounding)
    }
}

// --- Ollama ---

#[derive(Debug)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, RemoteError> {
        if request.grounding {
            log::warn!("Ollama has no search grounding; generating without citations");
        }
        let url = format!("{}/api/chat", self.base_url);

        let request_body = OllamaRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage { role: "user".to_string(), content: request.prompt.clone() },
            ],
            stream: false,
        };

        let resp = self.client.post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), format!("Ollama API error: {}", error_text)));
        }

        let result: OllamaResponse = resp.json().await.map_err(|e| transport_error("Ollama", e))?;
        Ok(GenerationResult::text(result.message.content))
    }
}

// --- OpenAI ---

#[derive(Debug)]
pub struct OpenAIClient {
    api_key: String,
    model: String,
    utility_model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str, utility_model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            utility_model: utility_model.to_string(),
            base_url: base_url.unwrap_or("https://api.openai.com/v1").trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LlmClient for OpenAIClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, RemoteError> {
        if request.grounding {
            log::warn!("OpenAI chat completions have no search grounding; generating without citations");
        }
        let url = format!("{}/chat/completions", self.base_url);
        let model = match request.tier {
            ModelTier::Chapter => &self.model,
            ModelTier::Utility => &self.utility_model,
        };

        let request_body = OpenAIRequest {
            model: model.clone(),
            messages: vec![
                OpenAIMessage { role: "user".to_string(), content: request.prompt.clone() },
            ],
        };

        let resp = self.client.post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), format!("OpenAI API error: {}", error_text)));
        }

        let result: OpenAIResponse = resp.json().await.map_err(|e| transport_error("OpenAI", e))?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(GenerationResult::text)
            .ok_or_else(|| RemoteError::permanent("OpenAI response empty or missing content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorClass;

    #[test]
    fn test_gemini_response_parsing_safety_block() {
        let json = r#"{
            "candidates": [
                {
                    "finishReason": "SAFETY",
                    "index": 0
                }
            ]
        }"#;

        let err = parse_gemini_response(json, false).unwrap_err();
        assert_eq!(err.class, ErrorClass::Permanent);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_gemini_response_parsing_success_joins_parts() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Hello " },
                            { "text": "world" }
                        ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        let result = parse_gemini_response(json, false).unwrap();
        assert_eq!(result.text, "Hello world");
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_gemini_grounding_chunks_become_sources() {
        let json = r#"{
            "candidates": [
                {
                    "content": { "parts": [ { "text": "Isi bab" } ] },
                    "groundingMetadata": {
                        "groundingChunks": [
                            { "web": { "uri": "https://a.example", "title": "A" } },
                            { "web": { "uri": "https://b.example" } },
                            { "web": { "uri": "", "title": "no uri" } },
                            { "web": { "title": "missing uri" } },
                            { "retrievedContext": { "uri": "x" } }
                        ]
                    }
                }
            ]
        }"#;

        let result = parse_gemini_response(json, true).unwrap();
        assert_eq!(
            result.sources,
            vec![
                Source::Web { uri: "https://a.example".into(), title: "A".into() },
                Source::Web { uri: "https://b.example".into(), title: "https://b.example".into() },
            ]
        );

        let ungrounded = parse_gemini_response(json, false).unwrap();
        assert!(ungrounded.sources.is_empty());
    }

    #[test]
    fn test_gemini_overloaded_is_transient() {
        let body = r#"{"error": {"code": 503, "message": "The model is overloaded. Please try again later.", "status": "UNAVAILABLE"}}"#;
        let err = gemini_http_error(503, body);
        assert!(err.is_transient());
        assert_eq!(err.status, Some(503));
        assert!(err.message.contains("UNAVAILABLE: The model is overloaded"));

        let quota = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(!gemini_http_error(429, quota).is_transient());
        assert!(!gemini_http_error(400, "not json").is_transient());
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: "p".to_string() }],
            }],
            tools: vec![GeminiTool { google_search: GoogleSearch {} }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tools"][0]["googleSearch"], serde_json::json!({}));

        let plain = GeminiRequest { contents: Vec::new(), tools: Vec::new() };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_gemini_endpoint_per_tier() {
        let client = GeminiClient::new("k3y", "gemini-2.5-pro", "gemini-2.5-flash");
        let chapter = client.endpoint(ModelTier::Chapter).unwrap();
        assert_eq!(
            chapter.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent?key=k3y"
        );
        let utility = client.endpoint(ModelTier::Utility).unwrap();
        assert!(utility.path().ends_with("gemini-2.5-flash:generateContent"));
    }

    #[test]
    fn test_openai_response_parsing_success() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello there, how may I assist you today?"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.choices[0].message.content.as_deref(),
            Some("Hello there, how may I assist you today?")
        );
    }
}

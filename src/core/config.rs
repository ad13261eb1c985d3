use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::services::retry::RetryPolicy;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_state")]
    pub state_folder: String,

    #[serde(default)]
    pub unattended: bool,

    pub llm: LlmConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // "gemini", "ollama" or "openai"
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    pub gemini: Option<GeminiConfig>,
    pub ollama: Option<OllamaConfig>,
    pub openai: Option<OpenAIConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    /// Falls back to `GEMINI_API_KEY` / `API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_utility_model")]
    pub utility_model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub utility_model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

fn default_output() -> String {
    "output".to_string()
}
fn default_state() -> String {
    "state".to_string()
}
fn default_retry_count() -> usize {
    2
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_gemini_utility_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            utility_model: default_gemini_utility_model(),
        }
    }
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Returns `configured` unless it is blank, then the first set variable.
pub fn resolve_api_key(configured: &str, env_vars: &[&str]) -> Option<String> {
    if !configured.trim().is_empty() {
        return Some(configured.trim().to_string());
    }
    env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse config.yml")
    }

    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }

        let content = std::fs::read_to_string(path).context("Failed to read config.yml")?;
        Self::from_yaml(&content)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_folder)
            .with_context(|| format!("Failed to create {}", self.output_folder))?;
        std::fs::create_dir_all(&self.state_folder)
            .with_context(|| format!("Failed to create {}", self.state_folder))?;
        Ok(())
    }
}

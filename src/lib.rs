pub mod core;
pub mod services;
pub mod utils;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).unwrap_or(());
}

#[cfg(target_arch = "wasm32")]
fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[cfg(target_arch = "wasm32")]
fn gemini_client(api_key: &str) -> crate::services::llm::GeminiClient {
    let defaults = crate::core::config::GeminiConfig::default();
    crate::services::llm::GeminiClient::new(api_key, &defaults.model, &defaults.utility_model)
}

/// Runs the chapter pipeline for a JSON form state and returns the outcome
/// as JSON. Finished documents are added to the browser history.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn generate_document(api_key: String, config_json: String) -> Result<String, JsValue> {
    use std::sync::Arc;
    use crate::core::document::DocumentConfiguration;
    use crate::core::io::WebStorage;
    use crate::services::pipeline::{Pipeline, PipelineOutcome};
    use crate::services::retry::RetryPolicy;
    use crate::services::session::SessionStore;

    let config: DocumentConfiguration = serde_json::from_str(&config_json).map_err(js_error)?;
    let storage = Arc::new(WebStorage::new().await.map_err(js_error)?);
    let session = SessionStore::new(storage);
    session.save_configuration(&config).await;

    let chapters = session.chapter_list(config.mode()).await;
    let pipeline = Pipeline::new(Box::new(gemini_client(&api_key)), RetryPolicy::default());
    let outcome = pipeline.run(&config, &chapters).await.map_err(|e| {
        log::error!("Generation failed: {}", e);
        js_error(e)
    })?;

    if let PipelineOutcome::Document(result) = &outcome {
        session.record_generation(&config, result).await;
    }
    serde_json::to_string(&outcome).map_err(js_error)
}

/// Title ideas for the topic in a JSON form state, as a JSON array.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn suggest_titles(api_key: String, config_json: String) -> Result<String, JsValue> {
    use crate::core::document::DocumentConfiguration;
    use crate::services::retry::RetryPolicy;

    let config: DocumentConfiguration = serde_json::from_str(&config_json).map_err(js_error)?;
    let llm = gemini_client(&api_key);
    let titles = crate::services::assist::suggest_titles(&llm, RetryPolicy::default(), &config)
        .await
        .map_err(js_error)?;
    serde_json::to_string(&titles).map_err(js_error)
}

//! Short helper requests that fill in form fields for the user.

use crate::core::document::{DocumentConfiguration, ResearchMethod};
use crate::core::error::{GenerationError, ValidationError};
use crate::services::llm::{GenerationRequest, LlmClient};
use crate::services::prompt::{compose_title_search_prompt, compose_variables_prompt};
use crate::services::retry::RetryPolicy;

const MIN_TITLE_CHARS: usize = 5;
const MIN_TOPIC_CHARS: usize = 10;

/// Proposes document titles for the configured topic.
pub async fn suggest_titles(
    llm: &dyn LlmClient,
    retry: RetryPolicy,
    config: &DocumentConfiguration,
) -> Result<Vec<String>, GenerationError> {
    if config.topic_description.trim().is_empty() {
        return Err(ValidationError::MissingTopic.into());
    }

    let request = GenerationRequest::utility(compose_title_search_prompt(config));
    let result = retry
        .run("mencari judul", None, || llm.generate(&request))
        .await?;

    Ok(result
        .text
        .lines()
        .map(|line| line.strip_prefix("- ").unwrap_or(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Proposes `X = ..., Y = ...` variables for quantitative research.
/// Returns `Ok(None)` without calling the model until the title and topic
/// say enough to work from.
pub async fn suggest_variables(
    llm: &dyn LlmClient,
    retry: RetryPolicy,
    config: &DocumentConfiguration,
) -> Result<Option<String>, GenerationError> {
    if !wants_variable_suggestion(config) {
        return Ok(None);
    }

    let request = GenerationRequest::utility(compose_variables_prompt(config));
    let result = retry
        .run("menyarankan variabel", None, || llm.generate(&request))
        .await?;
    Ok(Some(result.text.trim().to_string()))
}

fn wants_variable_suggestion(config: &DocumentConfiguration) -> bool {
    config.research_method == ResearchMethod::Kuantitatif
        && config.title.trim().chars().count() > MIN_TITLE_CHARS
        && config.topic_description.trim().chars().count() > MIN_TOPIC_CHARS
}

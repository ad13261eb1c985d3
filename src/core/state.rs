use crate::core::document::DocumentConfiguration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A citation attached to generated text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Web { uri: String, title: String },
    Maps { uri: String, title: String },
}

impl Source {
    pub fn uri(&self) -> &str {
        match self {
            Source::Web { uri, .. } | Source::Maps { uri, .. } => uri,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Source::Web { title, .. } | Source::Maps { title, .. } => title,
        }
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct GenerationResult {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl GenerationResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub content: GenerationResult,
    pub form_state_snapshot: DocumentConfiguration,
}

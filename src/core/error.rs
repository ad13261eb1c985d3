use thiserror::Error;

/// How a remote failure should be treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service is temporarily overloaded; the same request may succeed later.
    Transient,
    Permanent,
}

/// Failure reported by an [`LlmClient`](crate::services::llm::LlmClient).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub class: ErrorClass,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            status: None,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Permanent,
            status: None,
            message: message.into(),
        }
    }

    /// Classifies a failure that only came with a message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if mentions_overload(&message) {
            Self::transient(message)
        } else {
            Self::permanent(message)
        }
    }

    /// Classifies an HTTP failure. Only an overloaded service is worth retrying.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let class = if status == 503 || mentions_overload(&message) {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        };
        Self {
            class,
            status: Some(status),
            message,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class == ErrorClass::Transient
    }
}

fn mentions_overload(message: &str) -> bool {
    message.to_lowercase().contains("overloaded")
}

/// User input that cannot be sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the document title must not be empty")]
    EmptyTitle,
    #[error("select at least one chapter to generate")]
    NoChapters,
    #[error("'{0}' must be selected on its own")]
    SuggestionMustBeAlone(String),
    #[error("a topic description is required")]
    MissingTopic,
    #[error("'{value}' is not a known {field}")]
    UnknownOption { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("the model is overloaded while {context}, please try again in a moment")]
    Overloaded {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error("failed while {context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error("cancelled while {context}")]
    Cancelled { context: String },
}

impl GenerationError {
    /// Wraps a remote failure with the label of the operation that issued it.
    pub fn remote(context: impl Into<String>, source: RemoteError) -> Self {
        let context = context.into();
        if source.is_transient() {
            Self::Overloaded { context, source }
        } else {
            Self::Remote { context, source }
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Validation(_) => None,
            Self::Overloaded { context, .. }
            | Self::Remote { context, .. }
            | Self::Cancelled { context } => Some(context),
        }
    }
}

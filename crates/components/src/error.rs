use common::error::{ConfigError, DiagnosticMessage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("duplicate workflow object: {context}")]
    Duplicate { context: DiagnosticMessage },
    #[error("workflow object not found: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("invalid workflow object: {context}")]
    Invalid { context: DiagnosticMessage },
    #[error("config error: {context}")]
    Config {
        context: DiagnosticMessage,
        #[source]
        source: ConfigError,
    },
    #[error("serde json error: {context}")]
    SerdeJson {
        context: DiagnosticMessage,
        #[source]
        source: serde_json::Error,
    },
}

impl ComponentError {
    #[track_caller]
    pub fn duplicate(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::Duplicate {
            context: DiagnosticMessage::new(format!("object id '{id}' is already used")),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}

impl From<serde_json::Error> for ComponentError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        ComponentError::SerdeJson {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

impl From<ConfigError> for ComponentError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        ComponentError::Config {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

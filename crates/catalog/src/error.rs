use common::error::diagnostics::DiagnosticMessage;
use common::error::ConfigError;
use sql::SqlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("relation already exists: {context}")]
    Duplicate { context: DiagnosticMessage },
    #[error("relation lookup failed: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("unsupported relation: {context}")]
    Unsupported { context: DiagnosticMessage },
    /// The relation parsed but cannot support the requested script.
    #[error("SQL structure error: {context}")]
    Structure { context: DiagnosticMessage },
    #[error("dependency cycle between relations: {context}")]
    Cycle { context: DiagnosticMessage },
    #[error("SQL error: {context}")]
    Sql {
        context: DiagnosticMessage,
        #[source]
        source: SqlError,
    },
    #[error("configuration error: {context}")]
    Config {
        context: DiagnosticMessage,
        #[source]
        source: ConfigError,
    },
}

impl CatalogError {
    #[track_caller]
    pub fn duplicate(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Duplicate {
            context: DiagnosticMessage::new(format!("relation '{name}' is declared twice")),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn cycle(names: &[&str]) -> Self {
        Self::Cycle {
            context: DiagnosticMessage::new(format!("unsortable relations [{}]", names.join(", "))),
        }
    }
}

impl From<SqlError> for CatalogError {
    #[track_caller]
    fn from(err: SqlError) -> Self {
        CatalogError::Sql {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

impl From<ConfigError> for CatalogError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        CatalogError::Config {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

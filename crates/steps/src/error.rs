use catalog::CatalogError;
use common::error::{ConfigError, DiagnosticMessage};
use components::ComponentError;
use sql::SqlError;
use std::fmt::Display;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("invalid step input: {context}")]
    Input { context: DiagnosticMessage },
    #[error("unresolved reference: {context}")]
    Reference { context: DiagnosticMessage },
    #[error("invalid table structure: {context}")]
    Structure { context: DiagnosticMessage },
    #[error("sql error: {context}")]
    Sql {
        context: DiagnosticMessage,
        #[source]
        source: SqlError,
    },
    #[error("catalog error: {context}")]
    Catalog {
        context: DiagnosticMessage,
        #[source]
        source: CatalogError,
    },
    #[error("workflow object error: {context}")]
    Component {
        context: DiagnosticMessage,
        #[source]
        source: ComponentError,
    },
    #[error("config error: {context}")]
    Config {
        context: DiagnosticMessage,
        #[source]
        source: ConfigError,
    },
    #[error("template error: {context}")]
    Template {
        context: DiagnosticMessage,
        #[source]
        source: minijinja::Error,
    },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl StepError {
    #[track_caller]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference {
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
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: DiagnosticMessage::new(format!("{}: {source}", path.display())),
            source,
        }
    }

    pub fn context(&self) -> &DiagnosticMessage {
        match self {
            StepError::Input { context }
            | StepError::Reference { context }
            | StepError::Structure { context }
            | StepError::Sql { context, .. }
            | StepError::Catalog { context, .. }
            | StepError::Component { context, .. }
            | StepError::Config { context, .. }
            | StepError::Template { context, .. }
            | StepError::Io { context, .. } => context,
        }
    }

    /// Prefix the message with the step it was raised for.
    pub fn in_step(self, step_id: impl Display) -> Self {
        let prefix = format!("step '{step_id}'");
        match self {
            StepError::Input { context } => StepError::Input {
                context: context.with_context(prefix),
            },
            StepError::Reference { context } => StepError::Reference {
                context: context.with_context(prefix),
            },
            StepError::Structure { context } => StepError::Structure {
                context: context.with_context(prefix),
            },
            StepError::Sql { context, source } => StepError::Sql {
                context: context.with_context(prefix),
                source,
            },
            StepError::Catalog { context, source } => StepError::Catalog {
                context: context.with_context(prefix),
                source,
            },
            StepError::Component { context, source } => StepError::Component {
                context: context.with_context(prefix),
                source,
            },
            StepError::Config { context, source } => StepError::Config {
                context: context.with_context(prefix),
                source,
            },
            StepError::Template { context, source } => StepError::Template {
                context: context.with_context(prefix),
                source,
            },
            StepError::Io { context, source } => StepError::Io {
                context: context.with_context(prefix),
                source,
            },
        }
    }
}

macro_rules! step_error_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StepError {
                #[track_caller]
                fn from(err: $ty) -> Self {
                    StepError::$variant {
                        context: DiagnosticMessage::new(err.to_string()),
                        source: err,
                    }
                }
            }
        )*
    };
}

step_error_from!(
    Sql => SqlError,
    Catalog => CatalogError,
    Component => ComponentError,
    Config => ConfigError,
    Template => minijinja::Error,
);

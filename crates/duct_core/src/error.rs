use common::error::{ConfigError, DiagnosticMessage};
use components::ComponentError;
use dag::error::DagError;
use shared_clients::ObjectStoreError;
use std::io;
use std::path::Path;
use steps::StepError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid pipeline definition: {context}")]
    Input { context: DiagnosticMessage },
    #[error("unresolved reference: {context}")]
    Reference { context: DiagnosticMessage },
    #[error("{context}")]
    Step {
        context: DiagnosticMessage,
        #[source]
        source: StepError,
    },
    #[error("workflow object error: {context}")]
    Component {
        context: DiagnosticMessage,
        #[source]
        source: ComponentError,
    },
    #[error("activity graph error: {context}")]
    Dag {
        context: DiagnosticMessage,
        #[source]
        source: DagError,
    },
    #[error("config error: {context}")]
    Config {
        context: DiagnosticMessage,
        #[source]
        source: ConfigError,
    },
    #[error("YAML error: {context}")]
    Yaml {
        context: DiagnosticMessage,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
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
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: DiagnosticMessage::new(format!("{}: {source}", path.display())),
            source,
        }
    }
}

macro_rules! compile_error_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CompileError {
                #[track_caller]
                fn from(err: $ty) -> Self {
                    CompileError::$variant {
                        context: DiagnosticMessage::new(err.to_string()),
                        source: err,
                    }
                }
            }
        )*
    };
}

compile_error_from!(
    Step => StepError,
    Component => ComponentError,
    Dag => DagError,
    Config => ConfigError,
    Yaml => serde_yaml::Error,
);

#[derive(Debug, Error)]
pub enum ActivateError {
    #[error("upload failed: {context}")]
    Store {
        context: DiagnosticMessage,
        #[source]
        source: ObjectStoreError,
    },
    #[error("walking staged directory failed: {context}")]
    Walk {
        context: DiagnosticMessage,
        #[source]
        source: walkdir::Error,
    },
    #[error("rendering the definition failed: {context}")]
    Component {
        context: DiagnosticMessage,
        #[source]
        source: ComponentError,
    },
}

impl ActivateError {
    #[track_caller]
    pub fn store(dest: impl std::fmt::Display, source: ObjectStoreError) -> Self {
        Self::Store {
            context: DiagnosticMessage::new(format!("{dest}: {source}")),
            source,
        }
    }
}

impl From<walkdir::Error> for ActivateError {
    #[track_caller]
    fn from(err: walkdir::Error) -> Self {
        Self::Walk {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

impl From<ComponentError> for ActivateError {
    #[track_caller]
    fn from(err: ComponentError) -> Self {
        Self::Component {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

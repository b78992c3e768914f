use common::error::DiagnosticMessage;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("duplicated declaration of activity: {context}")]
    DuplicateNode { context: DiagnosticMessage },
    #[error("expected dependency not found: {context}")]
    MissingDependency { context: DiagnosticMessage },
    #[error("found cyclic references in activity graph: {context}")]
    CycleDetected {
        context: DiagnosticMessage,
        cycle: Vec<String>,
    },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl DagError {
    #[track_caller]
    pub fn duplicate_node(id: impl Into<String>) -> Self {
        Self::DuplicateNode {
            context: DiagnosticMessage::new(id.into()),
        }
    }

    #[track_caller]
    pub fn missing_dependency(message: impl Into<String>) -> Self {
        Self::MissingDependency {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn cycle(cycle: Vec<String>) -> Self {
        Self::CycleDetected {
            context: DiagnosticMessage::new(cycle.join(" -> ")),
            cycle,
        }
    }
}

impl From<io::Error> for DagError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

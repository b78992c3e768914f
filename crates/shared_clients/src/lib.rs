pub mod local;
pub mod retry;

pub use local::{LocalObjectStore, MemoryObjectStore};
pub use retry::RetryPolicy;

use common::error::DiagnosticMessage;
use common::types::S3Path;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("transient object store failure: {context}")]
    Transient { context: DiagnosticMessage },
    #[error("object store rejected the request: {context}")]
    Rejected { context: DiagnosticMessage },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: std::io::Error,
    },
}

impl ObjectStoreError {
    #[track_caller]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// Throttling and similar failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ObjectStoreError::Transient { .. })
    }
}

impl From<std::io::Error> for ObjectStoreError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            context: DiagnosticMessage::new(err.to_string()),
            source: err,
        }
    }
}

/// Destination for staged pipeline artifacts.
pub trait ObjectStore {
    fn put_bytes(&mut self, bytes: &[u8], dest: &S3Path) -> Result<(), ObjectStoreError>;
    fn exists(&self, dest: &S3Path) -> Result<bool, ObjectStoreError>;
    fn location(&self) -> String;

    fn put_file(&mut self, local: &Path, dest: &S3Path) -> Result<(), ObjectStoreError> {
        let bytes = std::fs::read(local)?;
        self.put_bytes(&bytes, dest)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for &mut T {
    fn put_bytes(&mut self, bytes: &[u8], dest: &S3Path) -> Result<(), ObjectStoreError> {
        (**self).put_bytes(bytes, dest)
    }

    fn exists(&self, dest: &S3Path) -> Result<bool, ObjectStoreError> {
        (**self).exists(dest)
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn put_file(&mut self, local: &Path, dest: &S3Path) -> Result<(), ObjectStoreError> {
        (**self).put_file(local, dest)
    }
}

use common::error::diagnostics::DiagnosticMessage;
use sqlparser::parser::ParserError;
use sqlparser::tokenizer::TokenizerError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("SQL parse error: {context}")]
    Parse { context: DiagnosticMessage },
    #[error("SQL structure error: {context}")]
    Structure { context: DiagnosticMessage },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl SqlError {
    #[track_caller]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
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
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: DiagnosticMessage::new(message.into()),
            source,
        }
    }
}

impl From<ParserError> for SqlError {
    #[track_caller]
    fn from(value: ParserError) -> Self {
        SqlError::parse(value.to_string())
    }
}

impl From<TokenizerError> for SqlError {
    #[track_caller]
    fn from(value: TokenizerError) -> Self {
        SqlError::parse(value.to_string())
    }
}

// models/src/errors.rs
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
pub use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("Storage error: {0}")]
    StorageError(String), // listing, download or upload failure against the remote service
    #[error("Failed to parse {key}: {reason}")]
    ParseError { key: String, reason: String },
    #[error("record {0} was not found")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Invalid data provided: {0}")]
    InvalidData(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("An internal error occurred: {0}")]
    InternalError(String),
}

impl RecordError {
    pub fn parse(key: impl Into<String>, reason: impl ToString) -> Self {
        RecordError::ParseError {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordError::NotFound(_))
    }
}

impl From<SerdeJsonError> for RecordError {
    fn from(err: SerdeJsonError) -> Self {
        RecordError::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<io::Error> for RecordError {
    fn from(err: io::Error) -> Self {
        RecordError::Io(err.to_string())
    }
}

impl From<ValidationError> for RecordError {
    fn from(err: ValidationError) -> Self {
        RecordError::InvalidData(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("'{0}' is not a valid storage path segment")]
    InvalidSegment(String),
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: String, value: String },
}

/// A type alias for a `Result` that returns a `RecordError` on failure.
pub type RecordResult<T> = Result<T, RecordError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

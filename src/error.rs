//! Error types for recording and replaying driver sources.

use crate::source::SourceKind;
use crate::types::Identifier;
use thiserror::Error;

/// Main error type for recycle operations.
#[derive(Debug, Error)]
pub enum RecycleError {
    #[error("Must handle possible state {0}")]
    MissingHandler(SourceKind),

    #[error("Unhandled possible type: {0}")]
    UnclassifiableValue(String),

    #[error("No live stream for replay target {0}")]
    ReplayTargetMissing(Identifier),

    #[error("No driver named {0} in the new driver set")]
    DriverMissing(String),

    #[error("Source of kind {0} is not callable")]
    NotCallable(SourceKind),

    #[error("Application runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },
}

impl RecycleError {
    /// Wrap a failure reported by the application runtime.
    pub fn runtime(message: impl Into<String>) -> Self {
        RecycleError::Runtime(message.into())
    }
}

impl From<serde_json::Error> for RecycleError {
    fn from(e: serde_json::Error) -> Self {
        RecycleError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for RecycleError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RecycleError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RecycleError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RecycleError::Deserialization(e.to_string())
    }
}

/// Result type for recycle operations.
pub type Result<T> = std::result::Result<T, RecycleError>;

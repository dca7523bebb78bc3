//! Core error types for `eveapi`.

use thiserror::Error;

/// Core error type for `eveapi` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown entity kind (expected character, corporation or alliance).
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// Unknown location kind (expected station or structure).
    #[error("Unknown location kind: {0}")]
    UnknownLocationKind(String),

    /// Credential refresh was rejected by the auth collaborator.
    #[error("Credential refresh rejected: {0}")]
    RefreshRejected(String),

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

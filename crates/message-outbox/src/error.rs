//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Durable store error
    #[error("Storage error: {0}")]
    Storage(#[from] squadlink_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API rejected the message
    #[error("Send failed: {0}")]
    Send(String),

    /// Unusable queue settings
    #[error("Invalid queue config: {0}")]
    InvalidConfig(String),

    /// Invalid API URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;

//! Check-in error types.

use thiserror::Error;

/// Check-in error type.
#[derive(Error, Debug)]
pub enum CheckInError {
    /// Scheduling input rejected
    #[error("Invalid check-in data: {0}")]
    InvalidData(String),

    /// Manager settings rejected
    #[error("Invalid check-in config: {0}")]
    InvalidConfig(String),

    /// No check-in with that id in the collection the operation needs
    #[error("Check-in not found: {0}")]
    NotFound(String),

    /// Durable store error
    #[error("Storage error: {0}")]
    Storage(#[from] squadlink_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CheckInError.
pub type CheckInResult<T> = Result<T, CheckInError>;

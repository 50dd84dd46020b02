//! Durable key-value storage for the Squadlink services.
//!
//! Each manager persists its whole state as one serialized blob under a
//! well-known key. This crate provides:
//! - **FileStore**: one file per key, replaced atomically on every save
//! - **MemoryStore**: process-local map, for tests and ephemeral runs

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::DurableStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key contains characters that cannot be mapped to a file name
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

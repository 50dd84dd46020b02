//! Storage trait definitions.

use crate::StorageResult;

/// A durable blob store keyed by short names.
///
/// Writes replace the previous value as a unit; there is no partial update.
pub trait DurableStore: Send + Sync {
    /// Load the blob stored under `key`, if any.
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`.
    fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Remove the blob. Returns whether something was removed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.load(key)?.is_some())
    }
}

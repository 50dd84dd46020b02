//! In-memory store.

use crate::{DurableStore, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        self.data.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }
}

//! In-memory key-value store
//!
//! Backs the cache with a plain `HashMap` behind a `parking_lot` lock. Used
//! in tests and anywhere durability across restarts is not required.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::StoreResult;

/// Thread-safe in-memory store
///
/// Clones share the same underlying map.
///
/// # Example
/// ```
/// use swr_cache::store::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("k", b"v").unwrap();
/// assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of stored values
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check whether the store holds no values
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.entries.write().clear();
        Ok(())
    }
}

//! Durable key-value backends for cached entries
//!
//! The cache talks to storage through the [`KeyValueStore`] trait so backends
//! can be swapped per deployment: [`MemoryStore`] for tests and ephemeral
//! use, [`SqliteStore`] for data that must survive restarts. Namespacing is
//! the cache's job (key prefixing); stores see opaque keys and bytes.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;

/// Platform-agnostic durable key-value store
///
/// Implementations must be safe to share across threads; the cache wraps the
/// store in an `Arc` and may call it from detached refresh tasks.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the bytes stored under `key`, or `None` if absent
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, overwriting any previous value
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove the value stored under `key`, if any
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every stored value
    fn clear(&self) -> StoreResult<()>;
}

/// Stores behind an `Arc` are stores
impl<S: KeyValueStore> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }
}

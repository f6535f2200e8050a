//! Error types for the cache and its storage backends
//!
//! Errors follow a strict propagation policy: a failed `produce` is only
//! returned to the caller when no cached fallback exists; storage faults
//! never fail a lookup, they degrade the cache to pass-through behavior.

use thiserror::Error;

/// Boxed error type preserving the identity of caller-supplied failures
///
/// `produce` closures return whatever error type the caller uses; it is
/// carried through unchanged so callers can `downcast` it back.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Storage backend error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or could not complete a read/write.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// Filesystem-level failure underneath a backend.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// SQLite failure from the durable backend.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Storage result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Cache error type
#[derive(Debug, Error)]
pub enum CacheError {
    /// The caller-supplied produce operation failed and no cached value was
    /// available to fall back to.
    #[error("produce operation failed: {0}")]
    Produce(#[source] BoxedError),

    /// The backing store failed in a way that could not be degraded around.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A stored entry could not be encoded or decoded.
    #[error("entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Keys must be non-empty.
    #[error("cache key must not be empty")]
    EmptyKey,
}

/// Cache result type
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// Borrow the original produce failure, if that is what this error is
    pub fn produce_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Produce(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

//! Stored entry envelope
//!
//! Every cached value is persisted as a small JSON envelope carrying the
//! wall-clock instant at which its producing operation resolved. Staleness
//! is judged against that timestamp, so TTL accounting reflects data
//! recency rather than request latency.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheResult;

/// A cached value plus the epoch-millisecond timestamp of its last
/// successful produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    /// When the producing operation resolved, in ms since the UNIX epoch
    pub stored_at: u64,
    /// The cached payload
    pub value: T,
}

/// Envelope view that only decodes the timestamp
///
/// The monotonic write guard needs `stored_at` without knowing the payload
/// type; unknown fields are ignored during deserialization.
#[derive(Debug, Deserialize)]
struct EntryStamp {
    stored_at: u64,
}

impl<T> StoredEntry<T> {
    /// Wrap a freshly produced value
    pub fn new(value: T, stored_at: u64) -> Self {
        Self { stored_at, value }
    }

    /// Age of this entry at `now_millis`
    ///
    /// Saturates to zero if the clock reads earlier than `stored_at`.
    pub fn age(&self, now_millis: u64) -> Duration {
        Duration::from_millis(now_millis.saturating_sub(self.stored_at))
    }

    /// An entry is fresh while its age is within the TTL, stale after
    pub fn is_fresh(&self, now_millis: u64, ttl: Duration) -> bool {
        self.age(now_millis) <= ttl
    }
}

impl<T: Serialize> StoredEntry<T> {
    /// Serialize the envelope for the byte-oriented store
    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<T: DeserializeOwned> StoredEntry<T> {
    /// Deserialize an envelope read back from the store
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Read just the `stored_at` stamp out of stored bytes
pub fn decode_stored_at(bytes: &[u8]) -> CacheResult<u64> {
    let stamp: EntryStamp = serde_json::from_slice(bytes)?;
    Ok(stamp.stored_at)
}

//! Stale-while-revalidate TTL cache over a pluggable durable key-value
//! store.
//!
//! A consumer reading through this cache during a backend outage sees its
//! most recent successfully cached data rather than an error, as long as at
//! least one successful fetch has happened since the store was last cleared:
//!
//! - **Fresh** entries (age within TTL) are served immediately; an optional
//!   background refresh revalidates them without blocking the caller.
//! - **Stale** entries trigger a synchronous refresh; if the producer fails,
//!   the stale value is served as a fallback and the failure only logged.
//! - **Absent** entries await the producer; with nothing to fall back to,
//!   its failure propagates unchanged.
//!
//! Entries live in a [`store::KeyValueStore`] ([`store::SqliteStore`] for
//! durability across restarts, [`store::MemoryStore`] for tests), timestamps
//! come from an injectable [`Clock`], and suppressed failures surface
//! through `tracing` warnings and [`CacheStats`] counters.
//!
//! See the [`cache`] module for usage examples.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod clock;
pub mod error;
pub mod store;
pub mod testing;

pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheStats, Lookup, LookupStatus, RefreshHandle,
    RefreshOptions, RefreshOutcome, StoredEntry, SwrCache, DEFAULT_NAMESPACE, DEFAULT_TTL,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{BoxedError, CacheError, CacheResult, StoreError, StoreResult};

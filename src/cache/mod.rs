//! Stale-while-revalidate cache with TTL and background refresh
//!
//! Serves a value for a key fast by preferring a previously stored value,
//! keeps data reasonably fresh by re-running the producing operation once
//! entries age past their TTL, and degrades gracefully when the producer or
//! the backing store fails.
//!
//! # Lookup state machine (per key)
//!
//! `Absent → Fresh` on the first successful produce, `Fresh → Stale` once
//! the TTL elapses, `Stale → Fresh` on a successful refresh (synchronous or
//! background). There is no terminal state: stale entries remain readable as
//! fallback data until overwritten or the store is cleared externally.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use swr_cache::store::MemoryStore;
//! use swr_cache::{BoxedError, CacheConfig, Lookup, LookupStatus, SwrCache};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = CacheConfig::builder()
//!         .ttl(Duration::from_secs(60))
//!         .background_refresh(false)
//!         .build();
//!     let cache = SwrCache::new(MemoryStore::new(), config);
//!
//!     // First call awaits the producer and stores the result.
//!     let lookup = cache
//!         .get_or_refresh("rooms", || async { Ok::<_, BoxedError>(vec![1, 2, 3]) })
//!         .await
//!         .unwrap();
//!     assert_eq!(lookup.status(), LookupStatus::Loaded);
//!
//!     // Within the TTL the stored value is served without producing.
//!     let lookup: Lookup<Vec<i32>> = cache
//!         .get_or_refresh("rooms", || async { unreachable!() })
//!         .await
//!         .unwrap();
//!     assert_eq!(lookup.value(), &vec![1, 2, 3]);
//! }
//! ```
//!
//! A stale entry is served as a fallback when the producer fails:
//!
//! ```
//! use std::time::Duration;
//!
//! use swr_cache::store::MemoryStore;
//! use swr_cache::{BoxedError, CacheConfig, LookupStatus, MockClock, SwrCache};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let clock = MockClock::new();
//!     let config = CacheConfig::builder()
//!         .ttl(Duration::from_millis(1_000))
//!         .background_refresh(false)
//!         .build();
//!     let cache = SwrCache::with_clock(MemoryStore::new(), config, clock.clone());
//!
//!     cache.get_or_refresh("k", || async { Ok::<_, BoxedError>(1) }).await.unwrap();
//!     clock.advance(Duration::from_millis(1_500));
//!
//!     let lookup = cache
//!         .get_or_refresh("k", || async { Err::<i32, _>(BoxedError::from("outage")) })
//!         .await
//!         .unwrap();
//!     assert_eq!(lookup.status(), LookupStatus::StaleFallback);
//!     assert_eq!(*lookup.value(), 1);
//! }
//! ```

mod config;
mod core;
mod entry;
mod stats;

pub use config::{CacheConfig, CacheConfigBuilder, RefreshOptions, DEFAULT_NAMESPACE, DEFAULT_TTL};
pub use core::{Lookup, LookupStatus, RefreshHandle, RefreshOutcome, SwrCache};
pub use entry::StoredEntry;
pub use stats::CacheStats;

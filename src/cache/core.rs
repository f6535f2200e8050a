//! Stale-while-revalidate cache core
//!
//! Implements the lookup state machine: absent entries await their first
//! produce, fresh entries short-circuit (optionally revalidating in a
//! detached task), stale entries revalidate synchronously and fall back to
//! the old value if the producing operation fails.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::config::{CacheConfig, RefreshOptions};
use super::entry::{decode_stored_at, StoredEntry};
use super::stats::{CacheStats, MetricsCollector};
use crate::clock::{Clock, SystemClock};
use crate::error::{BoxedError, CacheError, CacheResult};
use crate::store::KeyValueStore;

/// Which path served a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// Entry was within its TTL; served without awaiting produce
    Fresh,
    /// No entry existed; produce was awaited and its result stored
    Loaded,
    /// Entry was stale; produce was awaited and the entry replaced
    Refreshed,
    /// Entry was stale and produce failed; the old value was served
    StaleFallback,
}

/// Outcome of a detached background refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Produce succeeded and the stored entry was replaced
    Updated,
    /// Produce succeeded but a newer entry had already landed
    Discarded,
    /// Produce (or the write to the store) failed; entry left untouched
    Failed,
    /// The task was aborted before completing
    Cancelled,
}

/// Handle to a detached background refresh
///
/// Callers may drop this freely; the refresh runs to completion on its own.
/// Tests await it to observe the outcome deterministically instead of
/// sleeping.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<RefreshOutcome>,
}

impl RefreshHandle {
    /// Wait for the refresh to finish and report what it did
    pub async fn wait(self) -> RefreshOutcome {
        self.handle.await.unwrap_or(RefreshOutcome::Cancelled)
    }

    /// Abort the refresh task
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the task has already finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Result of a cache lookup: the value plus how it was obtained
#[derive(Debug)]
pub struct Lookup<T> {
    value: T,
    status: LookupStatus,
    refresh: Option<RefreshHandle>,
}

impl<T> Lookup<T> {
    /// Borrow the served value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the lookup, returning the served value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Which path served this lookup
    pub fn status(&self) -> LookupStatus {
        self.status
    }

    /// Take the handle of the background refresh started by this lookup
    ///
    /// Present only on a [`LookupStatus::Fresh`] lookup made with background
    /// refresh enabled, and only the first time it is taken.
    pub fn take_refresh(&mut self) -> Option<RefreshHandle> {
        self.refresh.take()
    }
}

/// How a guarded write to the store ended
enum WriteOutcome {
    Written,
    Superseded,
    Failed,
}

/// TTL cache with background refresh over a durable key-value store
///
/// Constructed with an injected store handle and clock; independent caches
/// (per tenant, per test) never collide and can be torn down by clearing
/// their own store. Clones share storage, metrics, and degradation state.
pub struct SwrCache<S, C = SystemClock>
where
    S: KeyValueStore,
    C: Clock + Clone,
{
    store: Arc<S>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
    /// Serializes the compare-timestamp-then-write sequence across tasks.
    write_guard: Arc<Mutex<()>>,
    /// Set on the first storage fault so degradation is logged once.
    degraded: Arc<AtomicBool>,
}

impl<S> SwrCache<S, SystemClock>
where
    S: KeyValueStore,
{
    /// Create a cache over `store` using the system clock
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S, C> SwrCache<S, C>
where
    S: KeyValueStore,
    C: Clock + Clone,
{
    /// Create a cache with a custom clock (useful for testing)
    pub fn with_clock(store: S, config: CacheConfig, clock: C) -> Self {
        let track_metrics = config.track_metrics;
        Self {
            store: Arc::new(store),
            config,
            metrics: MetricsCollector::new(track_metrics),
            clock,
            write_guard: Arc::new(Mutex::new(())),
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Look up `key`, using cache-level defaults for TTL and background
    /// refresh
    ///
    /// See [`Self::get_or_refresh_with`] for the full contract.
    pub async fn get_or_refresh<T, F, Fut>(&self, key: &str, produce: F) -> CacheResult<Lookup<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
    {
        self.get_or_refresh_with(key, RefreshOptions::default(), produce).await
    }

    /// Look up `key`, running `produce` as dictated by entry freshness
    ///
    /// - No entry: awaits `produce`, stores and returns its result; a
    ///   failure propagates unchanged (there is nothing to fall back to).
    /// - Fresh entry: returns the stored value immediately; when background
    ///   refresh is enabled, `produce` runs in a detached task whose handle
    ///   is available via [`Lookup::take_refresh`].
    /// - Stale entry: awaits `produce`; on success the entry is replaced, on
    ///   failure the stale value is served and the error only logged.
    ///
    /// The stored timestamp is captured when `produce` resolves, and a
    /// completed refresh never overwrites an entry stored later than itself.
    pub async fn get_or_refresh_with<T, F, Fut>(
        &self,
        key: &str,
        options: RefreshOptions,
        produce: F,
    ) -> CacheResult<Lookup<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
    {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let ttl = options.ttl.unwrap_or(self.config.ttl);
        let background = options.background_refresh.unwrap_or(self.config.background_refresh);
        let full_key = self.namespaced(key);

        let existing: Option<StoredEntry<T>> = self.load_entry(&full_key);
        let now = self.clock.millis_since_epoch();

        match existing {
            Some(entry) if entry.is_fresh(now, ttl) => {
                self.metrics.record_fresh_hit();
                let refresh =
                    if background { Some(self.spawn_refresh(full_key, produce())) } else { None };
                Ok(Lookup { value: entry.value, status: LookupStatus::Fresh, refresh })
            }
            Some(entry) => match produce().await {
                Ok(value) => {
                    let stored_at = self.clock.millis_since_epoch();
                    self.try_store(&full_key, &value, stored_at);
                    self.metrics.record_refresh();
                    Ok(Lookup { value, status: LookupStatus::Refreshed, refresh: None })
                }
                Err(err) => {
                    warn!(key = %full_key, error = %err, "produce failed; serving stale entry");
                    self.metrics.record_stale_fallback();
                    Ok(Lookup { value: entry.value, status: LookupStatus::StaleFallback, refresh: None })
                }
            },
            None => {
                let value = produce().await.map_err(CacheError::Produce)?;
                let stored_at = self.clock.millis_since_epoch();
                self.try_store(&full_key, &value, stored_at);
                self.metrics.record_cold_load();
                Ok(Lookup { value, status: LookupStatus::Loaded, refresh: None })
            }
        }
    }

    /// Read the stored entry for `key` without running any produce
    ///
    /// Returns the entry regardless of freshness; stale entries stay
    /// readable as fallback data until overwritten.
    pub fn peek<T>(&self, key: &str) -> CacheResult<Option<StoredEntry<T>>>
    where
        T: DeserializeOwned,
    {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        Ok(self.load_entry(&self.namespaced(key)))
    }

    /// Snapshot cache activity counters
    ///
    /// All counters read zero unless `track_metrics` was enabled.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether a storage fault has degraded this cache to pass-through
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Compose the store key for `key` under this cache's namespace
    ///
    /// The namespace is length-prefixed so distinct (namespace, key) pairs
    /// can never compose to the same store key, even when either side
    /// contains the separator (`"a"` + `"b:c"` vs `"a:b"` + `"c"`).
    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}:{}", self.config.namespace.len(), self.config.namespace, key)
    }

    fn spawn_refresh<T, Fut>(&self, full_key: String, fut: Fut) -> RefreshHandle
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            match fut.await {
                Ok(value) => {
                    let stored_at = cache.clock.millis_since_epoch();
                    match cache.try_store(&full_key, &value, stored_at) {
                        WriteOutcome::Written => {
                            debug!(key = %full_key, stored_at, "background refresh updated entry");
                            cache.metrics.record_background_update();
                            RefreshOutcome::Updated
                        }
                        WriteOutcome::Superseded => {
                            debug!(key = %full_key, stored_at, "background refresh superseded by newer entry");
                            cache.metrics.record_background_discard();
                            RefreshOutcome::Discarded
                        }
                        WriteOutcome::Failed => RefreshOutcome::Failed,
                    }
                }
                Err(err) => {
                    warn!(key = %full_key, error = %err, "background refresh failed; keeping existing entry");
                    RefreshOutcome::Failed
                }
            }
        });
        RefreshHandle { handle }
    }

    /// Load and decode the entry under `full_key`, absorbing faults
    ///
    /// Storage faults degrade the cache; undecodable bytes are treated as
    /// absent so one corrupt entry cannot wedge its key forever.
    fn load_entry<T: DeserializeOwned>(&self, full_key: &str) -> Option<StoredEntry<T>> {
        let bytes = match self.store.get(full_key) {
            Ok(bytes) => bytes?,
            Err(err) => {
                self.note_store_error(&err);
                return None;
            }
        };
        match StoredEntry::decode(&bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key = %full_key, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Write an entry unless a newer one already exists
    ///
    /// The guard keeps `stored_at` monotonically non-decreasing per key: a
    /// refresh that resolved earlier than the stored entry is discarded.
    fn try_store<T: Serialize>(&self, full_key: &str, value: &T, stored_at: u64) -> WriteOutcome {
        let bytes = match StoredEntry::new(value, stored_at).encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key = %full_key, error = %err, "failed to encode cache entry; not stored");
                return WriteOutcome::Failed;
            }
        };

        let _lock = self.write_guard.lock();

        match self.store.get(full_key) {
            Ok(Some(existing)) => {
                if let Ok(existing_stored_at) = decode_stored_at(&existing) {
                    if existing_stored_at > stored_at {
                        return WriteOutcome::Superseded;
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                self.note_store_error(&err);
                return WriteOutcome::Failed;
            }
        }

        match self.store.set(full_key, &bytes) {
            Ok(()) => WriteOutcome::Written,
            Err(err) => {
                self.note_store_error(&err);
                WriteOutcome::Failed
            }
        }
    }

    /// Record a storage fault, logging the degradation once per cache
    fn note_store_error(&self, err: &crate::error::StoreError) {
        self.metrics.record_store_error();
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!(error = %err, "storage backend failed; cache degraded to pass-through");
        } else {
            debug!(error = %err, "storage backend still failing");
        }
    }
}

impl<S, C> Clone for SwrCache<S, C>
where
    S: KeyValueStore,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
            write_guard: Arc::clone(&self.write_guard),
            degraded: Arc::clone(&self.degraded),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::core.
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::clock::MockClock;
    use crate::store::MemoryStore;

    fn test_cache(ttl_millis: u64) -> (SwrCache<MemoryStore, MockClock>, MockClock, MemoryStore) {
        let clock = MockClock::new();
        let store = MemoryStore::new();
        let config = CacheConfig::builder()
            .ttl(Duration::from_millis(ttl_millis))
            .background_refresh(false)
            .track_metrics(true)
            .build();
        let cache = SwrCache::with_clock(store.clone(), config, clock.clone());
        (cache, clock, store)
    }

    async fn prime(cache: &SwrCache<MemoryStore, MockClock>, key: &str, value: i32) {
        let lookup = cache
            .get_or_refresh(key, move || async move { Ok::<_, BoxedError>(value) })
            .await
            .unwrap();
        assert_eq!(lookup.status(), LookupStatus::Loaded);
    }

    #[tokio::test]
    async fn test_cold_load_stores_and_returns() {
        let (cache, _clock, store) = test_cache(1_000);

        let lookup =
            cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(7) }).await.unwrap();

        assert_eq!(*lookup.value(), 7);
        assert_eq!(lookup.status(), LookupStatus::Loaded);
        assert_eq!(store.len(), 1);

        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.value, 7);
        assert_eq!(entry.stored_at, 0);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (cache, _clock, _store) = test_cache(1_000);

        let result = cache.get_or_refresh("", || async { Ok::<_, BoxedError>(1) }).await;
        assert!(matches!(result, Err(CacheError::EmptyKey)));
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_produce() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(500);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        let lookup = cache
            .get_or_refresh("key", move || async move {
                calls_in.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxedError>(2)
            })
            .await
            .unwrap();

        assert_eq!(*lookup.value(), 1);
        assert_eq!(lookup.status(), LookupStatus::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_refresh_replaces_entry() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(1_500);

        let lookup =
            cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(2) }).await.unwrap();

        assert_eq!(*lookup.value(), 2);
        assert_eq!(lookup.status(), LookupStatus::Refreshed);

        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.value, 2);
        assert_eq!(entry.stored_at, 1_500);
    }

    #[tokio::test]
    async fn test_stale_failure_serves_fallback() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(2_000);

        let lookup = cache
            .get_or_refresh("key", || async { Err::<i32, _>(BoxedError::from("backend down")) })
            .await
            .unwrap();

        assert_eq!(*lookup.value(), 1);
        assert_eq!(lookup.status(), LookupStatus::StaleFallback);

        // Entry untouched: stored_at still the original produce time.
        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.stored_at, 0);
    }

    #[tokio::test]
    async fn test_cold_failure_propagates_and_stores_nothing() {
        let (cache, _clock, store) = test_cache(1_000);

        let result = cache
            .get_or_refresh::<i32, _, _>("key", || async {
                Err(BoxedError::from("auth rejected"))
            })
            .await;

        match result {
            Err(CacheError::Produce(err)) => assert_eq!(err.to_string(), "auth rejected"),
            other => panic!("expected produce error, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_background_refresh_updates_after_fresh_hit() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(400);

        let options = RefreshOptions::default().with_background_refresh(true);
        let mut lookup = cache
            .get_or_refresh_with("key", options, || async { Ok::<_, BoxedError>(2) })
            .await
            .unwrap();

        // The caller still sees the pre-call value.
        assert_eq!(*lookup.value(), 1);
        assert_eq!(lookup.status(), LookupStatus::Fresh);

        let handle = lookup.take_refresh().expect("background refresh spawned");
        assert_eq!(handle.wait().await, RefreshOutcome::Updated);

        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.value, 2);
        assert_eq!(entry.stored_at, 400);
    }

    #[tokio::test]
    async fn test_background_refresh_failure_leaves_entry_untouched() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(100);

        let options = RefreshOptions::default().with_background_refresh(true);
        let mut lookup = cache
            .get_or_refresh_with("key", options, || async {
                Err::<i32, _>(BoxedError::from("flaky upstream"))
            })
            .await
            .unwrap();

        let handle = lookup.take_refresh().unwrap();
        assert_eq!(handle.wait().await, RefreshOutcome::Failed);

        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.value, 1);
        assert_eq!(entry.stored_at, 0);
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let (cache, clock, _store) = test_cache(1_000);
        prime(&cache, "key", 1).await;

        // A newer entry lands at t=2000 via the synchronous stale path.
        clock.advance_millis(2_000);
        let lookup =
            cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(2) }).await.unwrap();
        assert_eq!(lookup.status(), LookupStatus::Refreshed);

        // Rewind the clock so a late-running refresh resolves "earlier".
        clock.set_elapsed(Duration::from_millis(500));
        let options = RefreshOptions::default().with_background_refresh(true);
        let mut lookup = cache
            .get_or_refresh_with("key", options, || async { Ok::<_, BoxedError>(99) })
            .await
            .unwrap();

        let handle = lookup.take_refresh().unwrap();
        assert_eq!(handle.wait().await, RefreshOutcome::Discarded);

        let entry = cache.peek::<i32>("key").unwrap().unwrap();
        assert_eq!(entry.value, 2);
        assert_eq!(entry.stored_at, 2_000);
    }

    #[tokio::test]
    async fn test_per_call_ttl_override() {
        let (cache, clock, _store) = test_cache(10_000);
        prime(&cache, "key", 1).await;

        clock.advance_millis(500);

        // Cache-level TTL says fresh; the per-call override says stale.
        let options = RefreshOptions::default().with_ttl(Duration::from_millis(100));
        let lookup = cache
            .get_or_refresh_with("key", options, || async { Ok::<_, BoxedError>(2) })
            .await
            .unwrap();

        assert_eq!(lookup.status(), LookupStatus::Refreshed);
        assert_eq!(*lookup.value(), 2);
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let store = MemoryStore::new();
        let clock = MockClock::new();
        let rooms = SwrCache::with_clock(
            store.clone(),
            CacheConfig::builder().namespace("rooms").build(),
            clock.clone(),
        );
        let clients = SwrCache::with_clock(
            store.clone(),
            CacheConfig::builder().namespace("clients").build(),
            clock.clone(),
        );

        prime_on(&rooms, "42", 1).await;
        prime_on(&clients, "42", 2).await;

        assert_eq!(rooms.peek::<i32>("42").unwrap().unwrap().value, 1);
        assert_eq!(clients.peek::<i32>("42").unwrap().unwrap().value, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_separator_in_namespace_or_key_cannot_collide() {
        let store = MemoryStore::new();
        let clock = MockClock::new();
        // "a" + "b:c" and "a:b" + "c" would both compose to "a:b:c" under
        // naive prefixing.
        let first = SwrCache::with_clock(
            store.clone(),
            CacheConfig::builder().namespace("a").build(),
            clock.clone(),
        );
        let second = SwrCache::with_clock(
            store.clone(),
            CacheConfig::builder().namespace("a:b").build(),
            clock.clone(),
        );

        prime_on(&first, "b:c", 1).await;
        prime_on(&second, "c", 2).await;

        assert_eq!(store.len(), 2);
        assert_eq!(first.peek::<i32>("b:c").unwrap().unwrap().value, 1);
        assert_eq!(second.peek::<i32>("c").unwrap().unwrap().value, 2);
    }

    async fn prime_on(cache: &SwrCache<MemoryStore, MockClock>, key: &str, value: i32) {
        cache
            .get_or_refresh(key, move || async move { Ok::<_, BoxedError>(value) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_entry_treated_as_absent() {
        let (cache, _clock, store) = test_cache(1_000);
        store.set("3:swr:key", b"{not json").unwrap();

        let lookup =
            cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(5) }).await.unwrap();

        assert_eq!(lookup.status(), LookupStatus::Loaded);
        assert_eq!(cache.peek::<i32>("key").unwrap().unwrap().value, 5);
    }

    #[tokio::test]
    async fn test_stats_track_lookup_paths() {
        let (cache, clock, _store) = test_cache(1_000);

        prime(&cache, "key", 1).await; // cold load
        let _ = cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(2) }).await; // fresh
        clock.advance_millis(2_000);
        let _ = cache.get_or_refresh("key", || async { Ok::<_, BoxedError>(3) }).await; // refresh
        clock.advance_millis(2_000);
        let _ = cache
            .get_or_refresh::<i32, _, _>("key", || async { Err(BoxedError::from("down")) })
            .await; // fallback

        let stats = cache.stats();
        assert_eq!(stats.cold_loads, 1);
        assert_eq!(stats.fresh_hits, 1);
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.stale_fallbacks, 1);
        assert_eq!(stats.total_lookups(), 4);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let (cache, _clock, _store) = test_cache(1_000);
        let clone = cache.clone();

        prime(&cache, "key", 1).await;
        assert_eq!(clone.peek::<i32>("key").unwrap().unwrap().value, 1);
    }
}

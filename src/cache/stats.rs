//! Cache statistics and metrics tracking
//!
//! Counters are kept with atomics so recording a lookup never takes a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of cache activity
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Lookups served straight from a fresh entry
    pub fresh_hits: u64,

    /// Lookups with no usable entry that awaited produce (cold start)
    pub cold_loads: u64,

    /// Stale lookups replaced by a successful synchronous refresh
    pub refreshes: u64,

    /// Stale lookups that served the old value because produce failed
    pub stale_fallbacks: u64,

    /// Background refreshes that completed and updated the store
    pub background_updates: u64,

    /// Background refreshes discarded because a newer entry already landed
    pub background_discards: u64,

    /// Storage faults absorbed by degrading to pass-through
    pub store_errors: u64,
}

impl CacheStats {
    /// Lookups served from a stored entry (fresh hits and stale
    /// fallbacks), over all lookups
    pub fn hit_rate(&self) -> f64 {
        let served = self.fresh_hits + self.stale_fallbacks;
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    /// Total number of lookups recorded
    pub fn total_lookups(&self) -> u64 {
        self.fresh_hits + self.cold_loads + self.refreshes + self.stale_fallbacks
    }
}

/// Thread-safe metrics collector for cache operations
#[derive(Debug)]
pub(crate) struct MetricsCollector {
    enabled: bool,
    fresh_hits: Arc<AtomicU64>,
    cold_loads: Arc<AtomicU64>,
    refreshes: Arc<AtomicU64>,
    stale_fallbacks: Arc<AtomicU64>,
    background_updates: Arc<AtomicU64>,
    background_discards: Arc<AtomicU64>,
    store_errors: Arc<AtomicU64>,
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            fresh_hits: Arc::clone(&self.fresh_hits),
            cold_loads: Arc::clone(&self.cold_loads),
            refreshes: Arc::clone(&self.refreshes),
            stale_fallbacks: Arc::clone(&self.stale_fallbacks),
            background_updates: Arc::clone(&self.background_updates),
            background_discards: Arc::clone(&self.background_discards),
            store_errors: Arc::clone(&self.store_errors),
        }
    }
}

impl MetricsCollector {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fresh_hits: Arc::new(AtomicU64::new(0)),
            cold_loads: Arc::new(AtomicU64::new(0)),
            refreshes: Arc::new(AtomicU64::new(0)),
            stale_fallbacks: Arc::new(AtomicU64::new(0)),
            background_updates: Arc::new(AtomicU64::new(0)),
            background_discards: Arc::new(AtomicU64::new(0)),
            store_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_fresh_hit(&self) {
        self.bump(&self.fresh_hits);
    }

    pub(crate) fn record_cold_load(&self) {
        self.bump(&self.cold_loads);
    }

    pub(crate) fn record_refresh(&self) {
        self.bump(&self.refreshes);
    }

    pub(crate) fn record_stale_fallback(&self) {
        self.bump(&self.stale_fallbacks);
    }

    pub(crate) fn record_background_update(&self) {
        self.bump(&self.background_updates);
    }

    pub(crate) fn record_background_discard(&self) {
        self.bump(&self.background_discards);
    }

    pub(crate) fn record_store_error(&self) {
        self.bump(&self.store_errors);
    }

    /// Snapshot current counter values
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            cold_loads: self.cold_loads.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            background_updates: self.background_updates.load(Ordering::Relaxed),
            background_discards: self.background_discards.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

//! Cache configuration types and builder patterns

use std::time::Duration;

/// Default TTL applied when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default key namespace prefix
pub const DEFAULT_NAMESPACE: &str = "swr";

/// Configuration for cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Duration after which a stored entry is considered stale
    pub ttl: Duration,

    /// Whether a fresh hit also starts a detached refresh
    pub background_refresh: bool,

    /// Key prefix isolating this cache's entries within a shared store
    pub namespace: String,

    /// Whether to collect hit/miss/refresh metrics
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            background_refresh: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            track_metrics: false,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Quick preset: given TTL, defaults for everything else
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use swr_cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl(Duration::from_secs(60));
    /// assert!(config.background_refresh);
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self { ttl: duration, ..Self::default() }
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness TTL
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.config.ttl = duration;
        self
    }

    /// Enable or disable background refresh on fresh hits
    pub fn background_refresh(mut self, enabled: bool) -> Self {
        self.config.background_refresh = enabled;
        self
    }

    /// Set the key namespace prefix
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Enable or disable metrics tracking
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

/// Per-call overrides for a single `get_or_refresh_with` invocation
///
/// Fields left as `None` fall back to the cache-level [`CacheConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Override the staleness TTL for this call
    pub ttl: Option<Duration>,

    /// Override whether a fresh hit starts a detached refresh
    pub background_refresh: Option<bool>,
}

impl RefreshOptions {
    /// Override the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Override background refresh behavior
    pub fn with_background_refresh(mut self, enabled: bool) -> Self {
        self.background_refresh = Some(enabled);
        self
    }
}

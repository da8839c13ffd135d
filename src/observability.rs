//! Observability hooks for cache operations.
//!
//! Implement [`CacheMetrics`] to feed hits, misses, writes, deletes and
//! expirations into your monitoring system:
//!
//! ```ignore
//! use expiring_kv::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!     }
//!     // ... implement other methods
//! }
//!
//! // let cache = InMemoryBackend::with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! The default methods log through the `log` crate. A backend built without
//! an explicit sink uses [`NoOpMetrics`].

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache set operation.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record removal of `count` entries (one for `remove`, any number for
    /// `remove_prefix` and `reset`).
    fn record_delete(&self, key: &str, count: usize) {
        debug!("Cache DELETE: {} ({} entries)", key, count);
    }

    /// Record an entry removed by the expiry sweeper.
    fn record_expire(&self, key: &str) {
        debug!("Cache EXPIRE: {}", key);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _count: usize) {}
    fn record_expire(&self, _key: &str) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

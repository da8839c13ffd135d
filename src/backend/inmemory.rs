//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for concurrent access with per-key sharding, so single-key
//! operations on different keys never contend. A store-wide bulk guard is
//! taken shared by single-key operations and exclusive by `remove_prefix` and
//! `reset`, which makes those scans atomic with respect to everything else.
//!
//! Expiration is enforced twice: a background sweeper removes each
//! TTL-bearing insertion when its deadline passes, and reads treat an entry
//! past its deadline as absent even if the sweeper has not run yet.

use super::expiry::{self, Expiration, ExpirySender};
use super::{ttl_from_seconds, CacheBackend};
use crate::error::{Error, Result};
use crate::observability::{CacheMetrics, NoOpMetrics};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// What `incr` does with a key that has no entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IncrPolicy {
    /// Fail with `Error::NotAnInteger` and create nothing.
    #[default]
    Strict,
    /// Count from zero: the key is created as `"1"` with no expiration.
    InitializeZero,
}

/// Configuration for the in-memory backend.
///
/// # Example
///
/// ```
/// use expiring_kv::backend::{InMemoryBackend, InMemoryConfig, IncrPolicy};
///
/// let config = InMemoryConfig::default().with_incr_policy(IncrPolicy::InitializeZero);
/// let cache = InMemoryBackend::with_config(config);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryConfig {
    /// Behavior of `incr` on a missing key. Defaults to [`IncrPolicy::Strict`].
    pub incr_policy: IncrPolicy,
}

impl InMemoryConfig {
    /// Set how `incr` treats missing keys.
    pub fn with_incr_policy(mut self, policy: IncrPolicy) -> Self {
        self.incr_policy = policy;
        self
    }
}

/// In-memory cache entry: one insertion of a value.
struct CacheEntry {
    data: String,
    /// Insertion id; expirations only ever remove the insertion they were scheduled for.
    id: u64,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: String, id: u64, ttl: Option<Duration>) -> Self {
        // A deadline past the end of the clock never arrives.
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));
        CacheEntry {
            data,
            id,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// State shared by every clone of an [`InMemoryBackend`] and by its sweeper.
pub(crate) struct Shared {
    entries: DashMap<String, CacheEntry>,
    bulk: RwLock<()>,
    next_id: AtomicU64,
    /// `None` until the first TTL write inside a runtime.
    sweeper: Mutex<Option<ExpirySender>>,
    /// Expirations queued in the sweeper, as last reported by it.
    pending: Arc<AtomicUsize>,
    metrics: Arc<dyn CacheMetrics>,
    config: InMemoryConfig,
}

impl Shared {
    /// Run `f` on the live entry under `key`.
    ///
    /// An entry past its deadline is removed (if it is still the same
    /// insertion) and reported as absent. Callers hold the bulk guard.
    fn read_live<R>(&self, key: &str, f: impl FnOnce(&CacheEntry) -> R) -> Option<R> {
        let expired_id = {
            let entry = self.entries.get(key)?;
            if !entry.is_expired() {
                return Some(f(entry.value()));
            }
            entry.id
        };

        if self
            .entries
            .remove_if(key, |_, entry| entry.id == expired_id)
            .is_some()
        {
            self.metrics.record_expire(key);
        }
        None
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// True if the entry under `key` is still insertion `id` and has a deadline.
    pub(crate) fn is_scheduled(&self, key: &str, id: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.id == id && entry.expires_at.is_some())
    }

    /// One expiration for every stored entry that has a deadline.
    fn scheduled_expirations(&self) -> Vec<Expiration> {
        self.entries
            .iter()
            .filter_map(|item| {
                item.expires_at.map(|deadline| Expiration {
                    deadline,
                    id: item.id,
                    key: item.key().clone(),
                })
            })
            .collect()
    }

    /// Remove each due insertion that is still the one stored under its key.
    pub(crate) async fn expire(&self, due: &[Expiration]) {
        if due.is_empty() {
            return;
        }

        let _guard = self.bulk.read().await;
        for expiration in due {
            let removed = self
                .entries
                .remove_if(&expiration.key, |_, entry| entry.id == expiration.id);
            if removed.is_some() {
                self.metrics.record_expire(&expiration.key);
                debug!("✓ InMemory EXPIRE {}", expiration.key);
            }
        }
    }
}

/// Thread-safe async in-memory cache backend.
///
/// Cloning is cheap and every clone shares the same entries. Independent
/// stores are created with [`InMemoryBackend::new`]; there is no global state.
///
/// The expiry sweeper starts on the first TTL-bearing write made from inside
/// a Tokio runtime, and is started again on the current runtime if the one
/// it ran on has shut down. Without a runtime, expired entries are still
/// never returned but are only reclaimed when read.
///
/// # Example
///
/// ```no_run
/// use expiring_kv::backend::{CacheBackend, InMemoryBackend};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = InMemoryBackend::new();
///
///     // Store data
///     cache.set("key1", "value", 0).await;
///
///     // Retrieve data
///     let value = cache.get_or_fail("key1").await?;
///     assert_eq!(value, "value");
///
///     // Store with a 5 minute TTL
///     cache.set("key2", "expires", 300).await;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend.
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default())
    }

    /// Create a backend with custom configuration.
    pub fn with_config(config: InMemoryConfig) -> Self {
        Self::from_parts(config, Arc::new(NoOpMetrics))
    }

    /// Create a backend that reports to `metrics`.
    pub fn with_metrics(metrics: Arc<dyn CacheMetrics>) -> Self {
        Self::from_parts(InMemoryConfig::default(), metrics)
    }

    /// Create a backend with custom configuration and metrics.
    pub fn from_parts(config: InMemoryConfig, metrics: Arc<dyn CacheMetrics>) -> Self {
        InMemoryBackend {
            shared: Arc::new(Shared {
                entries: DashMap::new(),
                bulk: RwLock::new(()),
                next_id: AtomicU64::new(1),
                sweeper: Mutex::new(None),
                pending: Arc::new(AtomicUsize::new(0)),
                metrics,
                config,
            }),
        }
    }

    /// Get the current number of entries in cache.
    ///
    /// Includes entries past their deadline that have not been swept yet.
    pub async fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Check if cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    /// Get memory statistics.
    pub async fn stats(&self) -> CacheStats {
        let _guard = self.shared.bulk.read().await;
        let mut stats = CacheStats::default();

        for item in self.shared.entries.iter() {
            stats.total_entries += 1;
            stats.total_bytes += item.key().len() + item.data.len();
            if item.is_expired() {
                stats.expired_entries += 1;
            }
        }
        stats.pending_expirations = self.shared.pending.load(Ordering::Relaxed);

        stats
    }

    /// Print cache statistics to debug log.
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        debug!(
            "Cache Stats: {} entries ({} expired), {} bytes",
            stats.total_entries, stats.expired_entries, stats.total_bytes
        );
    }

    fn next_id(&self) -> u64 {
        self.shared.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn new_entry(&self, value: &str, ttl_seconds: i64) -> CacheEntry {
        CacheEntry::new(value.to_string(), self.next_id(), ttl_from_seconds(ttl_seconds))
    }

    fn schedule_expiry(&self, key: &str, id: u64, deadline: Option<Instant>) {
        let Some(deadline) = deadline else {
            return;
        };

        let mut sweeper = self
            .shared
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(sender) = sweeper.as_ref() {
            let expiration = Expiration {
                deadline,
                id,
                key: key.to_string(),
            };
            match sender.send(expiration) {
                Ok(()) => return,
                Err(SendError(_)) => {
                    debug!("InMemory sweeper is gone, restarting on the current runtime");
                }
            }
        }

        // First start, or the runtime the previous sweeper ran on has shut down.
        // The new sweeper is seeded from the entries themselves, which covers
        // this insertion and anything queued on a dead sweeper.
        let Ok(handle) = Handle::try_current() else {
            *sweeper = None;
            warn!("⚠ InMemory: no Tokio runtime, expired entries are only dropped when read");
            return;
        };

        let sender = expiry::spawn(
            &handle,
            Arc::downgrade(&self.shared),
            Arc::clone(&self.shared.pending),
        );
        for expiration in self.shared.scheduled_expirations() {
            if sender.send(expiration).is_err() {
                break;
            }
        }
        *sweeper = Some(sender);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn exists(&self, key: &str) -> bool {
        let _guard = self.shared.bulk.read().await;
        self.shared.read_live(key, |_| ()).is_some()
    }

    async fn get_or_fail(&self, key: &str) -> Result<String> {
        let start = Instant::now();
        let _guard = self.shared.bulk.read().await;

        match self.shared.read_live(key, |entry| entry.data.clone()) {
            Some(value) => {
                self.shared.metrics.record_hit(key, start.elapsed());
                debug!("✓ InMemory GET {} -> HIT", key);
                Ok(value)
            }
            None => {
                self.shared.metrics.record_miss(key, start.elapsed());
                debug!("✓ InMemory GET {} -> MISS", key);
                Err(Error::NotFound(key.to_string()))
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) {
        let start = Instant::now();
        let entry = self.new_entry(value, ttl_seconds);
        let (id, deadline) = (entry.id, entry.expires_at);

        {
            let _guard = self.shared.bulk.read().await;
            self.shared.entries.insert(key.to_string(), entry);
        }
        self.schedule_expiry(key, id, deadline);

        self.shared.metrics.record_set(key, start.elapsed());
        if ttl_seconds > 0 {
            debug!("✓ InMemory SET {} (TTL: {}s)", key, ttl_seconds);
        } else {
            debug!("✓ InMemory SET {}", key);
        }
    }

    async fn set_if_not_exist(&self, key: &str, value: &str, ttl_seconds: i64) -> bool {
        let start = Instant::now();
        let entry = self.new_entry(value, ttl_seconds);
        let (id, deadline) = (entry.id, entry.expires_at);

        let written = {
            let _guard = self.shared.bulk.read().await;
            match self.shared.entries.entry(key.to_string()) {
                MapEntry::Occupied(mut occupied) => {
                    if occupied.get().is_expired() {
                        occupied.insert(entry);
                        true
                    } else {
                        false
                    }
                }
                MapEntry::Vacant(vacant) => {
                    vacant.insert(entry);
                    true
                }
            }
        };

        if written {
            self.schedule_expiry(key, id, deadline);
            self.shared.metrics.record_set(key, start.elapsed());
        }
        debug!("✓ InMemory SETNX {} -> {}", key, written);
        written
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let removed = {
            let _guard = self.shared.bulk.read().await;
            self.shared.entries.remove(key).is_some()
        };

        self.shared.metrics.record_delete(key, usize::from(removed));
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<()> {
        let mut removed = 0usize;
        {
            let _guard = self.shared.bulk.write().await;
            self.shared.entries.retain(|key, _| {
                if key.starts_with(prefix) {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }

        self.shared.metrics.record_delete(prefix, removed);
        debug!("✓ InMemory DELETE PREFIX {:?} ({} keys)", prefix, removed);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let missing = || Error::NotAnInteger(format!("{} has no value", key));

        let outcome = {
            let _guard = self.shared.bulk.read().await;
            match self.shared.entries.entry(key.to_string()) {
                MapEntry::Occupied(mut occupied) if !occupied.get().is_expired() => {
                    let entry = occupied.get_mut();
                    match entry.data.parse::<i64>().ok().and_then(|n| n.checked_add(1)) {
                        Some(next) => {
                            entry.data = next.to_string();
                            Ok(next)
                        }
                        None => Err(Error::NotAnInteger(format!(
                            "{} holds {:?}",
                            key, entry.data
                        ))),
                    }
                }
                MapEntry::Occupied(mut occupied) => match self.shared.config.incr_policy {
                    IncrPolicy::Strict => Err(missing()),
                    IncrPolicy::InitializeZero => {
                        occupied.insert(CacheEntry::new("1".to_string(), self.next_id(), None));
                        Ok(1)
                    }
                },
                MapEntry::Vacant(vacant) => match self.shared.config.incr_policy {
                    IncrPolicy::Strict => Err(missing()),
                    IncrPolicy::InitializeZero => {
                        vacant.insert(CacheEntry::new("1".to_string(), self.next_id(), None));
                        Ok(1)
                    }
                },
            }
        };

        match &outcome {
            Ok(value) => debug!("✓ InMemory INCR {} -> {}", key, value),
            Err(e) => self.shared.metrics.record_error(key, &e.to_string()),
        }
        outcome
    }

    async fn reset(&self) {
        let cleared = {
            let _guard = self.shared.bulk.write().await;
            let count = self.shared.entries.len();
            self.shared.entries.clear();
            count
        };

        self.shared.metrics.record_delete("", cleared);
        warn!("⚠ InMemory RESET executed - {} entries discarded", cleared);
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
    /// Expirations waiting in the sweeper's queue.
    pub pending_expirations: usize,
}

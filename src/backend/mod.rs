//! Cache backend contract and the in-memory implementation.

use crate::error::Result;
use crate::serialization::{marshal, unmarshal};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

mod expiry;
pub mod inmemory;

pub use inmemory::{CacheStats, InMemoryBackend, InMemoryConfig, IncrPolicy};

/// Convert a TTL in whole seconds into a duration.
///
/// Zero or negative means "no expiration".
pub fn ttl_from_seconds(seconds: i64) -> Option<Duration> {
    if seconds > 0 {
        Some(Duration::from_secs(seconds as u64))
    } else {
        None
    }
}

/// Contract shared by every cache backend.
///
/// `InMemoryBackend` implements it for single-process use and tests; an
/// adapter for a remote cache implements the same trait so callers never
/// depend on where the data lives.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability (sharded maps, locks, or external storage).
///
/// TTLs are whole seconds; `0` or negative means the entry never expires.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync + Clone {
    /// True iff `key` currently has an entry. Does not touch its expiration.
    async fn exists(&self, key: &str) -> bool;

    /// Retrieve the value stored under `key`.
    ///
    /// Every other getter on this trait is derived from this one.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the key has no entry.
    async fn get_or_fail(&self, key: &str) -> Result<String>;

    /// Retrieve the value stored under `key`, or `fallback` if there is none.
    async fn get_with_fallback(&self, key: &str, fallback: &str) -> String {
        match self.get_or_fail(key).await {
            Ok(value) => value,
            Err(_) => fallback.to_string(),
        }
    }

    /// Retrieve the value under `key` as a base-10 `i64`.
    ///
    /// Returns `fallback` when the key is absent or its value does not parse.
    async fn get_i64_with_fallback(&self, key: &str, fallback: i64) -> i64 {
        self.get_with_fallback(key, &fallback.to_string())
            .await
            .parse()
            .unwrap_or(fallback)
    }

    /// Insert or overwrite `key`.
    ///
    /// A positive `ttl_seconds` schedules removal of this insertion after that
    /// many seconds. Re-setting the key replaces any earlier expiration.
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64);

    /// Atomically insert `key` only if it has no entry.
    ///
    /// Returns `true` if the value was written.
    async fn set_if_not_exist(&self, key: &str, value: &str, ttl_seconds: i64) -> bool;

    /// Marshal `value` and store the text under `key`.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the value cannot be marshaled;
    /// nothing is written in that case.
    async fn set_marshal<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: i64,
    ) -> Result<()> {
        let text = marshal(value)?;
        self.set(key, &text, ttl_seconds).await;
        Ok(())
    }

    /// Retrieve and unmarshal the value under `key`.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key has no entry
    /// - `Error::DeserializationError` if the stored text does not decode into `T`
    async fn get_marshal<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self.get_or_fail(key).await?;
        unmarshal(&raw)
    }

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Err` only if a remote backend fails.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key that starts with `prefix` (byte-wise, case-sensitive).
    ///
    /// The empty prefix removes everything.
    ///
    /// # Errors
    /// Returns `Err` only if a remote backend fails.
    async fn remove_prefix(&self, prefix: &str) -> Result<()>;

    /// Atomically add one to the integer stored under `key` and return the
    /// new value. The entry's expiration is left as it was.
    ///
    /// # Errors
    /// Returns `Error::NotAnInteger` if the key is absent or its value is not
    /// a base-10 `i64`; the stored value is left untouched.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Discard every entry.
    async fn reset(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_ttl_from_seconds() {
        assert_eq!(ttl_from_seconds(5), Some(Duration::from_secs(5)));
        assert_eq!(ttl_from_seconds(0), None);
        assert_eq!(ttl_from_seconds(-3), None);
    }

    #[tokio::test]
    async fn test_backend_get_with_fallback_default() {
        let backend = InMemoryBackend::new();
        backend.set("key", "value", 0).await;

        assert_eq!(backend.get_with_fallback("key", "other").await, "value");
        assert_eq!(backend.get_with_fallback("missing", "other").await, "other");
    }

    #[tokio::test]
    async fn test_backend_get_i64_with_fallback_default() {
        let backend = InMemoryBackend::new();
        backend.set("number", "17", 0).await;
        backend.set("word", "seventeen", 0).await;

        assert_eq!(backend.get_i64_with_fallback("number", 42).await, 17);
        assert_eq!(backend.get_i64_with_fallback("word", 42).await, 42);
        assert_eq!(backend.get_i64_with_fallback("missing", 42).await, 42);
    }

    #[tokio::test]
    async fn test_backend_get_marshal_errors() {
        let backend = InMemoryBackend::new();
        backend.set("plain", "not json", 0).await;

        let missing: Result<Vec<u32>> = backend.get_marshal("missing").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let garbled: Result<Vec<u32>> = backend.get_marshal("plain").await;
        assert!(matches!(garbled, Err(Error::DeserializationError(_))));
    }
}

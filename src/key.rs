//! Cache key management utilities.
//!
//! Keys are opaque to the cache itself. These helpers only fix a
//! `namespace:id` convention so that namespaces can be invalidated in bulk
//! with `CacheBackend::remove_prefix`.

/// Separator between key segments.
pub const KEY_SEPARATOR: &str = ":";

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build a key from a namespace and an ID: `"user"`, `42` → `"user:42"`.
    pub fn build(prefix: &str, id: &dyn std::fmt::Display) -> String {
        format!("{}{}{}", prefix, KEY_SEPARATOR, id)
    }

    /// Prefix that matches every key built under `prefix` and nothing else.
    ///
    /// `namespace("user")` is `"user:"`, so removing it leaves `"users:1"` alone.
    pub fn namespace(prefix: &str) -> String {
        format!("{}{}", prefix, KEY_SEPARATOR)
    }

    /// Build composite key from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(KEY_SEPARATOR)
    }

    /// Parse a composite key into parts.
    pub fn parse(key: &str) -> Vec<&str> {
        key.split(KEY_SEPARATOR).collect()
    }
}

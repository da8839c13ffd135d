//! Error types for cache operations.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Value reported by counter adapters that need a numeric failure marker.
///
/// `CacheBackend::incr` carries failures in its `Err` arm; this constant is the
/// number a caller should surface when it has to flatten that into an integer.
pub const INCR_FAILED: i64 = -1;

/// Error types for cache operations.
///
/// Every failed operation leaves the cache exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The key has no entry (never set, removed, or expired).
    NotFound(String),

    /// The value could not be encoded into the marshal format.
    ///
    /// Nothing is written when this is returned.
    SerializationError(String),

    /// The stored text could not be decoded into the requested type.
    ///
    /// Common causes:
    /// - The key holds plain text that was never written with `set_marshal`
    /// - The key was written with a different type than the one requested
    DeserializationError(String),

    /// A counter operation hit a missing key or a value that is not a
    /// base-10 `i64` (or would overflow one).
    NotAnInteger(String),

    /// Backend storage error.
    ///
    /// Never produced by `InMemoryBackend`; reserved for adapters that talk to
    /// a remote cache through the same contract.
    BackendError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(key) => write!(f, "Key not found: {}", key),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::NotAnInteger(msg) => write!(f, "Not an integer: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

//! # expiring-kv
//!
//! An embeddable key/value cache with per-entry expiry, prefix invalidation,
//! structured values and an atomic counter.
//!
//! ## Features
//!
//! - **One contract:** [`CacheBackend`] is implemented by the in-memory store
//!   here and can be implemented by a remote-cache adapter, so callers don't
//!   change when the backend does
//! - **Concurrent:** every operation is safe to call from any number of tasks
//!   or threads; check-then-act operations (`set_if_not_exist`, `incr`) are atomic
//! - **Precise expiry:** each TTL is bound to the insertion that set it, so a
//!   late expiration never deletes a newer value stored under the same key
//! - **Structured values:** `set_marshal`/`get_marshal` store any `serde` type as JSON
//!
//! ## Quick Start
//!
//! ```no_run
//! use expiring_kv::{CacheBackend, CacheKeyBuilder, InMemoryBackend};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> expiring_kv::Result<()> {
//! let cache = InMemoryBackend::new();
//!
//! // Plain values with a 60 second TTL
//! cache.set("greeting", "hello", 60).await;
//!
//! // Structured values
//! let user = User { id: 1, name: "Alice".to_string() };
//! cache.set_marshal(&CacheKeyBuilder::build("user", &user.id), &user, 300).await?;
//! let cached: User = cache.get_marshal("user:1").await?;
//!
//! // Counters
//! cache.set("visits", "0", 0).await;
//! let visits = cache.incr("visits").await?;
//!
//! // Invalidate a whole namespace
//! cache.remove_prefix(&CacheKeyBuilder::namespace("user")).await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod error;
pub mod key;
pub mod observability;
pub mod serialization;

// Re-exports for convenience
pub use backend::{CacheBackend, InMemoryBackend, InMemoryConfig, IncrPolicy};
pub use error::{Error, Result, INCR_FAILED};
pub use key::CacheKeyBuilder;

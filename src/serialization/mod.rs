//! JSON marshal format for structured cache values.
//!
//! Values are stored as strings, so structured data goes through a
//! self-describing text encoding. JSON keeps entries readable by any other
//! client of the same cache (including a remote one speaking the same
//! contract).
//!
//! # Example
//!
//! ```rust
//! use expiring_kv::serialization::{marshal, unmarshal};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # fn main() -> expiring_kv::Result<()> {
//! let user = User { id: 1, name: "Alice".to_string() };
//!
//! let text = marshal(&user)?;
//! assert_eq!(text, r#"{"id":1,"name":"Alice"}"#);
//!
//! let back: User = unmarshal(&text)?;
//! assert_eq!(user, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value into its canonical JSON text.
///
/// # Errors
///
/// Returns `Error::SerializationError` if the value has no JSON form
/// (for example a map whose keys are not strings or integers).
pub fn marshal<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        debug!("Cache marshal failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode JSON text produced by [`marshal`] into `T`.
///
/// # Errors
///
/// Returns `Error::DeserializationError` if the text is not valid JSON or
/// does not match the shape of `T`.
pub fn unmarshal<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        debug!("Cache unmarshal failed: {}", e);
        Error::DeserializationError(e.to_string())
    })
}

//! Storage keys and concurrency stamps.
//!
//! Every stored record is addressed by a `(PartitionKey, RowKey)` pair. The
//! partition groups related records, the row key is unique within its
//! partition. Use the `define_key!` macro to create further string-backed
//! key types that cannot be mixed up with each other.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe string key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `new()`, `generate()` (fresh UUID v4), `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display`
///
/// # Example
///
/// ```rust
/// # use abc_retail_core::define_key;
/// define_key!(ShelfKey);
///
/// let key = ShelfKey::new("aisle-4");
/// assert_eq!(key.as_str(), "aisle-4");
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a key from any string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Create a fresh, globally unique key.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().to_string())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the key and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(PartitionKey);
define_key!(RowKey);

/// Opaque concurrency stamp (ETag) assigned by the store on every write.
///
/// Callers never construct a meaningful token themselves; they hand back the
/// one they read to make an update conditional on nobody having written in
/// between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Issue a fresh token, distinct from every previously issued one.
    #[must_use]
    pub fn fresh() -> Self {
        Self(format!("W/\"{}\"", Uuid::new_v4().simple()))
    }

    /// Wrap a token previously issued by a store.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full address of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub partition_key: PartitionKey,
    pub row_key: RowKey,
}

impl EntityKey {
    #[must_use]
    pub fn new(partition_key: impl Into<PartitionKey>, row_key: impl Into<RowKey>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_unique() {
        assert_ne!(RowKey::generate(), RowKey::generate());
    }

    #[test]
    fn test_fresh_tokens_are_distinct() {
        assert_ne!(VersionToken::fresh(), VersionToken::fresh());
    }

    #[test]
    fn test_key_serializes_transparently() {
        let key = PartitionKey::new("Customer");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"Customer\"");
    }

    #[test]
    fn test_entity_key_display() {
        let key = EntityKey::new("Sneaker", "abc");
        assert_eq!(key.to_string(), "Sneaker/abc");
    }
}

//! The capability every stored record type shares.
//!
//! Storage backends are written once against [`Entity`] and reused for
//! customers, products and orders.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{EntityKey, PartitionKey, RowKey, VersionToken};

/// Storage-owned metadata carried by every entity.
///
/// `version` and `timestamp` are assigned by the store on every successful
/// write; values supplied by callers on insert are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub partition_key: PartitionKey,
    pub row_key: RowKey,
    #[serde(default)]
    pub version: Option<VersionToken>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EntityMetadata {
    /// Metadata for a record that has not been stored yet.
    #[must_use]
    pub fn new(partition_key: impl Into<PartitionKey>, row_key: impl Into<RowKey>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            version: None,
            timestamp: None,
        }
    }

    /// Metadata with a freshly generated row key.
    #[must_use]
    pub fn fresh(partition_key: impl Into<PartitionKey>) -> Self {
        Self::new(partition_key, RowKey::generate())
    }

    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            partition_key: self.partition_key.clone(),
            row_key: self.row_key.clone(),
        }
    }
}

/// Metadata field names that every entity kind can be filtered on.
pub const METADATA_FIELDS: &[&str] = &["partition_key", "row_key", "timestamp"];

/// A record type that can be kept in an entity store.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Short kind name used in logs and error messages.
    const KIND: &'static str;

    /// Data fields that query filters may reference, in addition to
    /// [`METADATA_FIELDS`].
    const FIELDS: &'static [&'static str];

    fn metadata(&self) -> &EntityMetadata;

    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    fn partition_key(&self) -> &PartitionKey {
        &self.metadata().partition_key
    }

    fn row_key(&self) -> &RowKey {
        &self.metadata().row_key
    }

    fn version(&self) -> Option<&VersionToken> {
        self.metadata().version.as_ref()
    }

    fn key(&self) -> EntityKey {
        self.metadata().key()
    }

    /// Whether `field` may appear in a query filter for this kind.
    fn is_declared_field(field: &str) -> bool {
        METADATA_FIELDS.contains(&field) || Self::FIELDS.contains(&field)
    }
}

/// Implements [`Entity`] for a struct with a `meta: EntityMetadata` field.
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $kind:literal, [$($field:literal),* $(,)?]) => {
        impl $crate::entity::Entity for $ty {
            const KIND: &'static str = $kind;
            const FIELDS: &'static [&'static str] = &[$($field),*];

            fn metadata(&self) -> &$crate::entity::EntityMetadata {
                &self.meta
            }

            fn metadata_mut(&mut self) -> &mut $crate::entity::EntityMetadata {
                &mut self.meta
            }
        }
    };
}

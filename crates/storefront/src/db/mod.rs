//! Entity storage.
//!
//! One generic [`EntityStore`] contract serves customers, products and orders.
//! Two backends implement it:
//!
//! - [`postgres::PgEntityStore`] keeps each entity kind in its own `PostgreSQL`
//!   table as a JSONB document keyed by `(partition_key, row_key)`
//! - [`memory::MemoryEntityStore`] keeps records in process, for tests and
//!   local development
//!
//! # Tables
//!
//! Entity tables are created on first use:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS customers (
//!     partition_key TEXT NOT NULL,
//!     row_key       TEXT NOT NULL,
//!     etag          TEXT NOT NULL,
//!     updated_at    TIMESTAMPTZ NOT NULL,
//!     data          JSONB NOT NULL,
//!     PRIMARY KEY (partition_key, row_key)
//! );
//! ```

pub mod memory;
pub mod postgres;
mod sql_filter;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use abc_retail_core::{Entity, Filter, FilterError, PartitionKey, RowKey, VersionToken};

pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;

/// Boxed source error of a storage failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors shared by the entity, queue and document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record, message or file does not exist.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// Duplicate key on insert, or a stale version token on update.
    #[error("conflict on {kind} {key}: {reason}")]
    Conflict {
        kind: &'static str,
        key: String,
        reason: String,
    },

    /// The request itself is malformed (bad filter, unsafe path, bad name).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The backing service failed or was unreachable.
    #[error("storage failure during {context}: {source}")]
    StorageFailure {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn conflict(kind: &'static str, key: impl ToString, reason: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failure(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::StorageFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Lazily evaluated query results.
pub type EntityStream<T> = BoxStream<'static, Result<T, StoreError>>;

/// CRUD and filtered queries over one entity kind.
///
/// Every successful write assigns a fresh version token and timestamp, which
/// the returned entity carries. The container is provisioned on first use;
/// [`EntityStore::ensure_container`] does it eagerly and is idempotent.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Create the backing container if it does not exist yet.
    async fn ensure_container(&self) -> Result<(), StoreError>;

    /// Insert a new entity. Fails with `Conflict` if the key is taken.
    async fn add(&self, entity: T) -> Result<T, StoreError>;

    /// Point read by key.
    async fn get(&self, partition_key: &PartitionKey, row_key: &RowKey) -> Result<T, StoreError>;

    /// Replace an existing entity if its stored version equals `expected`.
    async fn update(&self, entity: T, expected: &VersionToken) -> Result<T, StoreError>;

    /// Remove an entity by key.
    async fn delete(&self, partition_key: &PartitionKey, row_key: &RowKey)
    -> Result<(), StoreError>;

    /// Stream every entity matching `filter`, in unspecified order.
    ///
    /// A filter that references an undeclared field fails with `Validation`
    /// before any record is read.
    async fn query(&self, filter: Filter) -> Result<EntityStream<T>, StoreError>;
}

/// Run `filter` and collect every match.
///
/// # Errors
///
/// Returns the first error produced by the query or its stream.
pub async fn collect<T: Entity>(
    store: &dyn EntityStore<T>,
    filter: Filter,
) -> Result<Vec<T>, StoreError> {
    store.query(filter).await?.try_collect().await
}

/// Version token an update must present, taken from a previously read entity.
///
/// # Errors
///
/// Returns `StoreError::Validation` for an entity that was never stored.
pub fn expected_version<T: Entity>(entity: &T) -> Result<VersionToken, StoreError> {
    entity.version().cloned().ok_or_else(|| {
        StoreError::Validation(format!(
            "{} {} has no version token; read it from the store first",
            T::KIND,
            entity.key()
        ))
    })
}

/// Assign a fresh version token and timestamp before a write.
pub(crate) fn stamp<T: Entity>(entity: &mut T) -> VersionToken {
    let meta = entity.metadata_mut();
    let version = VersionToken::fresh();
    meta.version = Some(version.clone());
    meta.timestamp = Some(Utc::now());
    version
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Check a table name is a plain lower-case SQL identifier.
///
/// Table names are interpolated into DDL and DML, so nothing else is allowed.
///
/// # Errors
///
/// Returns `StoreError::Validation` describing the problem.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid_start || !valid_rest || name.len() > 63 {
        return Err(StoreError::Validation(format!(
            "`{name}` is not a valid table name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("customers").is_ok());
        assert!(validate_identifier("_orders_2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2orders").is_err());
        assert!(validate_identifier("Orders").is_err());
        assert!(validate_identifier("orders; drop table x").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("product", "Sneaker/1");
        assert_eq!(err.to_string(), "product Sneaker/1 not found");
        assert!(err.is_not_found());

        let err = StoreError::from(FilterError::UndeclaredField {
            kind: "order",
            field: "price".to_owned(),
        });
        assert!(matches!(err, StoreError::Validation(_)));
    }
}

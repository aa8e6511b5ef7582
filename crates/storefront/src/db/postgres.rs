//! `PostgreSQL` entity store.
//!
//! Each entity kind lives in its own table; the entity itself is stored as a
//! JSONB document alongside its key columns and current version token.

use std::marker::PhantomData;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::OnceCell;
use tracing::instrument;

use abc_retail_core::{Entity, EntityKey, Filter, PartitionKey, RowKey, VersionToken};

use super::sql_filter::{SqlFilter, SqlParam};
use super::{EntityStore, EntityStream, StoreError, stamp, validate_identifier};

/// Entity store over one `PostgreSQL` table.
pub struct PgEntityStore<T> {
    pool: PgPool,
    table: String,
    provisioned: OnceCell<()>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> PgEntityStore<T> {
    /// Create a store over `table`. The table is created on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if `table` is not a plain identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        validate_identifier(table)?;
        Ok(Self {
            pool,
            table: table.to_owned(),
            provisioned: OnceCell::new(),
            _kind: PhantomData,
        })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn failure(&self, operation: &str, err: sqlx::Error) -> StoreError {
        StoreError::failure(format!("{} {operation} on {}", T::KIND, self.table), err)
    }

    async fn exists(&self, key: &EntityKey) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE partition_key = $1 AND row_key = $2)",
            self.table
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(key.partition_key.as_str())
            .bind(key.row_key.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.failure("exists", e))
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for PgEntityStore<T> {
    async fn ensure_container(&self) -> Result<(), StoreError> {
        self.provisioned
            .get_or_try_init(|| async {
                let sql = format!(
                    r"
                    CREATE TABLE IF NOT EXISTS {} (
                        partition_key TEXT NOT NULL,
                        row_key       TEXT NOT NULL,
                        etag          TEXT NOT NULL,
                        updated_at    TIMESTAMPTZ NOT NULL,
                        data          JSONB NOT NULL,
                        PRIMARY KEY (partition_key, row_key)
                    )
                    ",
                    self.table
                );
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| self.failure("provision", e))?;
                tracing::info!(table = %self.table, kind = T::KIND, "Entity table ready");
                Ok::<_, StoreError>(())
            })
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, entity), fields(table = %self.table))]
    async fn add(&self, mut entity: T) -> Result<T, StoreError> {
        self.ensure_container().await?;
        let key = entity.key();
        let version = stamp(&mut entity);
        let updated_at = entity.metadata().timestamp;
        let sql = format!(
            "INSERT INTO {} (partition_key, row_key, etag, updated_at, data) \
             VALUES ($1, $2, $3, $4, $5)",
            self.table
        );
        sqlx::query(&sql)
            .bind(key.partition_key.as_str())
            .bind(key.row_key.as_str())
            .bind(version.as_str())
            .bind(updated_at)
            .bind(Json(&entity))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::conflict(T::KIND, &key, "key already exists");
                }
                self.failure("add", e)
            })?;
        Ok(entity)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn get(&self, partition_key: &PartitionKey, row_key: &RowKey) -> Result<T, StoreError> {
        self.ensure_container().await?;
        let sql = format!(
            "SELECT data FROM {} WHERE partition_key = $1 AND row_key = $2",
            self.table
        );
        let row = sqlx::query_as::<_, (Json<T>,)>(&sql)
            .bind(partition_key.as_str())
            .bind(row_key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.failure("get", e))?;

        match row {
            Some((Json(entity),)) => Ok(entity),
            None => Err(StoreError::not_found(
                T::KIND,
                EntityKey::new(partition_key.clone(), row_key.clone()),
            )),
        }
    }

    #[instrument(skip(self, entity), fields(table = %self.table))]
    async fn update(&self, mut entity: T, expected: &VersionToken) -> Result<T, StoreError> {
        self.ensure_container().await?;
        let key = entity.key();
        let version = stamp(&mut entity);
        let updated_at = entity.metadata().timestamp;
        let sql = format!(
            "UPDATE {} SET etag = $1, updated_at = $2, data = $3 \
             WHERE partition_key = $4 AND row_key = $5 AND etag = $6",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(version.as_str())
            .bind(updated_at)
            .bind(Json(&entity))
            .bind(key.partition_key.as_str())
            .bind(key.row_key.as_str())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| self.failure("update", e))?;

        if result.rows_affected() == 1 {
            return Ok(entity);
        }
        if self.exists(&key).await? {
            Err(StoreError::conflict(T::KIND, key, "version token is stale"))
        } else {
            Err(StoreError::not_found(T::KIND, key))
        }
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn delete(
        &self,
        partition_key: &PartitionKey,
        row_key: &RowKey,
    ) -> Result<(), StoreError> {
        self.ensure_container().await?;
        let sql = format!(
            "DELETE FROM {} WHERE partition_key = $1 AND row_key = $2",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(partition_key.as_str())
            .bind(row_key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| self.failure("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(
                T::KIND,
                EntityKey::new(partition_key.clone(), row_key.clone()),
            ));
        }
        Ok(())
    }

    async fn query(&self, filter: Filter) -> Result<EntityStream<T>, StoreError> {
        filter.validate_for::<T>()?;
        self.ensure_container().await?;

        let SqlFilter { clause, params } = SqlFilter::build(&filter);
        let sql = format!("SELECT data FROM {} WHERE {clause}", self.table);
        let context = format!("{} query on {}", T::KIND, self.table);
        let pool = self.pool.clone();
        tracing::debug!(%sql, "Streaming entity query");

        Ok(stream! {
            let mut query = sqlx::query_as::<_, (Json<T>,)>(&sql);
            for param in params {
                query = match param {
                    SqlParam::Field(field) => query.bind(field),
                    SqlParam::Json(value) => query.bind(Json(value)),
                };
            }
            let mut rows = query.fetch(&pool);
            while let Some(row) = rows.next().await {
                yield row
                    .map(|(Json(entity),)| entity)
                    .map_err(|e| StoreError::failure(context.clone(), e));
            }
        }
        .boxed())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abc_retail_core::{Customer, Order, Product};

    use super::*;

    fn assert_entity_store<T: Entity>(_: &dyn EntityStore<T>) {}

    #[tokio::test]
    async fn test_every_entity_kind_has_a_store() {
        let pool = PgPool::connect_lazy("postgres://localhost/abc_retail").unwrap();
        assert_entity_store(&PgEntityStore::<Customer>::new(pool.clone(), "customers").unwrap());
        assert_entity_store(&PgEntityStore::<Product>::new(pool.clone(), "products").unwrap());
        assert_entity_store(&PgEntityStore::<Order>::new(pool, "orders").unwrap());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_table_names() {
        let pool = PgPool::connect_lazy("postgres://localhost/abc_retail").unwrap();
        assert!(PgEntityStore::<Product>::new(pool.clone(), "products").is_ok());
        assert!(matches!(
            PgEntityStore::<Product>::new(pool, "products; DROP TABLE customers"),
            Err(StoreError::Validation(_))
        ));
    }
}

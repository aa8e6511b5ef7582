//! `PostgreSQL` event queue.
//!
//! All queues share one table; each message row carries its queue name.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS queue_messages (
//!     id          BIGSERIAL PRIMARY KEY,
//!     queue_name  TEXT NOT NULL,
//!     body        TEXT NOT NULL,
//!     inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::instrument;

use super::EventQueue;
use crate::db::StoreError;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS queue_messages (
        id          BIGSERIAL PRIMARY KEY,
        queue_name  TEXT NOT NULL,
        body        TEXT NOT NULL,
        inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

const CREATE_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS queue_messages_queue_name_id
        ON queue_messages (queue_name, id)
";

/// Queue stored as rows of the `queue_messages` table.
pub struct PgEventQueue {
    pool: PgPool,
    name: String,
    provisioned: OnceCell<()>,
}

impl PgEventQueue {
    /// Create a handle for queue `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty name.
    pub fn new(pool: PgPool, name: &str) -> Result<Self, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("queue name is empty".to_owned()));
        }
        Ok(Self {
            pool,
            name: name.to_owned(),
            provisioned: OnceCell::new(),
        })
    }

    /// Number of messages currently in this queue.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StorageFailure` if the count query fails.
    pub async fn len(&self) -> Result<i64, StoreError> {
        self.ensure_queue().await?;
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_messages WHERE queue_name = $1")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::failure(format!("count queue {}", self.name), e))
    }
}

#[async_trait]
impl EventQueue for PgEventQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_queue(&self) -> Result<(), StoreError> {
        self.provisioned
            .get_or_try_init(|| async {
                for ddl in [CREATE_TABLE, CREATE_INDEX] {
                    sqlx::query(ddl)
                        .execute(&self.pool)
                        .await
                        .map_err(|e| StoreError::failure("provision queue_messages", e))?;
                }
                tracing::info!(queue = %self.name, "Event queue ready");
                Ok::<_, StoreError>(())
            })
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, envelope), fields(queue = %self.name))]
    async fn send(&self, envelope: String) -> Result<(), StoreError> {
        self.ensure_queue().await?;
        sqlx::query("INSERT INTO queue_messages (queue_name, body) VALUES ($1, $2)")
            .bind(&self.name)
            .bind(envelope)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::failure(format!("send to queue {}", self.name), e))?;
        Ok(())
    }
}

//! Storage provisioning.
//!
//! Every backend also provisions itself on first use; this command does it
//! ahead of time, for example from a deploy script.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Create the entity tables, the audit queue, the invoice share and the
/// session table if absent.
///
/// # Errors
///
/// Returns `CommandError` if configuration is invalid or any container
/// cannot be created.
pub async fn run() -> Result<(), CommandError> {
    let (backends, pool) = connect().await?;
    backends.provision().await?;
    PostgresStore::new(pool).migrate().await?;
    tracing::info!("Provisioning complete");
    Ok(())
}

//! CLI command implementations.

pub mod customer;
pub mod provision;

use sqlx::PgPool;
use thiserror::Error;

use abc_retail_storefront::backends::Backends;
use abc_retail_storefront::config::{ConfigError, StorefrontConfig};
use abc_retail_storefront::db::{StoreError, create_pool};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No customer with email: {0}")]
    CustomerNotFound(String),
}

/// Load configuration and connect to the production backends.
async fn connect() -> Result<(Backends, PgPool), CommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;
    let backends = Backends::postgres(&pool, &config)?;
    Ok((backends, pool))
}

//! Administration error types.

use thiserror::Error;

use abc_retail_core::ValidationError;

use crate::db::StoreError;
use crate::services::auth::AuthError;

#[derive(Debug, Error)]
pub enum AdminError {
    /// Missing session, stale session or not an administrator.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationError> for AdminError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

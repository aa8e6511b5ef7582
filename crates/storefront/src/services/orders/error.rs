//! Order workflow error types.

use thiserror::Error;

use abc_retail_core::ValidationError;

use crate::db::StoreError;
use crate::invoice::RenderError;

/// Why an order could not be created.
///
/// Storage errors are mapped onto the caller-facing kinds; the underlying
/// cause of a `StorageFailure` is kept as the error source.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No session, or a session that is no longer valid.
    #[error("not signed in")]
    Unauthorized,

    /// Customer, product or invoice file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed order line or invoice input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The order identity collided with an existing record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A backend failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StoreError),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::StorageFailure { .. } => Self::StorageFailure(err),
        }
    }
}

impl From<ValidationError> for OrderError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RenderError> for OrderError {
    fn from(err: RenderError) -> Self {
        Self::Validation(err.to_string())
    }
}

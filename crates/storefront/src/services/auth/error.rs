//! Authentication error types.

use thiserror::Error;

use abc_retail_core::{EmailError, ValidationError};

use crate::db::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session, or a session whose token no longer matches the account.
    #[error("not signed in")]
    Unauthorized,

    /// Signed in, but the account lacks the administrator role.
    #[error("administrator role required")]
    Forbidden,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// Malformed registration input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Entity store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

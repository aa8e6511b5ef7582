//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::StoreError;
use crate::services::admin::AdminError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order creation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Administration operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Store(err) => store_status(err),
    }
}

impl AppError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => store_status(err),
            Self::Auth(err) | Self::Admin(AdminError::Auth(err)) => auth_status(err),
            Self::Admin(AdminError::Store(err)) => store_status(err),
            Self::Order(err) => match err {
                OrderError::Unauthorized => StatusCode::UNAUTHORIZED,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Conflict(_) => StatusCode::CONFLICT,
                OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Admin(AdminError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else if matches!(
            self,
            Self::Auth(AuthError::AlreadyRegistered)
                | Self::Admin(AdminError::Auth(AuthError::AlreadyRegistered))
        ) {
            "An account with this email already exists".to_string()
        } else if status == StatusCode::UNAUTHORIZED {
            "Sign in required".to_string()
        } else if status == StatusCode::FORBIDDEN {
            "Administrator role required".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_store_error_status_codes() {
        assert_eq!(
            get_status(StoreError::not_found("product", "Sneaker/1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(StoreError::conflict("order", "a/b", "version mismatch")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(StoreError::Validation("bad field".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(StoreError::failure("write", "disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_and_order_status_codes() {
        assert_eq!(get_status(AuthError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AuthError::AlreadyRegistered), StatusCode::CONFLICT);
        assert_eq!(get_status(OrderError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(OrderError::Validation("size".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AdminError::Auth(AuthError::Forbidden)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AdminError::Store(StoreError::not_found("order", "a/b"))),
            StatusCode::NOT_FOUND
        );
    }
}

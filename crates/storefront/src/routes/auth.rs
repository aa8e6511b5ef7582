//! Authentication route handlers.
//!
//! JSON endpoints for registration, password login and logout. A successful
//! login stores the customer's [`SessionIdentity`](crate::models::SessionIdentity)
//! in the session.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use abc_retail_core::Customer;

use super::customers::CustomerView;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{CurrentSession, clear_session_identity, set_session_identity};
use crate::models::SessionIdentity;
use crate::services::auth::{AuthError, RegisterRequest};
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn sign_in(session: &Session, customer: &Customer) -> Result<()> {
    let identity = SessionIdentity::for_customer(customer)
        .ok_or_else(|| AppError::Internal("signed-in customer has no token".to_string()))?;
    set_session_identity(session, &identity).await?;
    set_sentry_user(&customer.customer_id, Some(customer.email.as_str()));
    Ok(())
}

/// Register a new account and sign it in.
///
/// POST /auth/register
///
/// # Errors
///
/// Returns 400 for invalid input and 409 if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    let customer = state.auth().register(request).await?;
    sign_in(&session, &customer).await?;
    Ok((StatusCode::CREATED, Json(CustomerView::from(customer))).into_response())
}

/// Sign in with email and password.
///
/// POST /auth/login
///
/// # Errors
///
/// Returns 401 for an unknown email or a wrong password, without saying which.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<CustomerView>> {
    let customer = state
        .auth()
        .authenticate(&request.email, &request.password)
        .await?
        .ok_or(AuthError::Unauthorized)?;
    sign_in(&session, &customer).await?;
    Ok(Json(CustomerView::from(customer)))
}

/// Sign out.
///
/// POST /auth/logout
///
/// Succeeds without a session.
///
/// # Errors
///
/// Returns 500 if the stored token or the session cannot be cleared.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    CurrentSession(identity): CurrentSession,
) -> Result<StatusCode> {
    if let Some(identity) = identity {
        let key = &identity.customer;
        state.auth().logout(&key.partition_key, &key.row_key).await?;
    }
    clear_session_identity(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in customer.
///
/// GET /auth/me
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn me(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
) -> Result<Json<CustomerView>> {
    let customer = state.auth().resolve_session(identity.as_ref()).await?;
    Ok(Json(CustomerView::from(customer)))
}

//! Session identity extraction.
//!
//! The session only carries a [`SessionIdentity`]; whether it is still valid
//! is decided by the services, which compare the token against the stored
//! customer.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::SessionIdentity;
use crate::models::session::keys;

/// Extractor for the identity held in the current session, if any.
///
/// Never rejects: a missing session layer, an empty session and an
/// unreadable session all yield `None`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     State(state): State<AppState>,
///     CurrentSession(session): CurrentSession,
/// ) -> Result<Json<Customer>, AppError> {
///     Ok(Json(state.auth().resolve_session(session.as_ref()).await?))
/// }
/// ```
pub struct CurrentSession(pub Option<SessionIdentity>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<SessionIdentity>(keys::CURRENT_CUSTOMER)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Unreadable session"))
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(identity))
    }
}

/// Store the signed-in customer's identity in the session.
///
/// The session ID is cycled first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_identity(
    session: &Session,
    identity: &SessionIdentity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_CUSTOMER, identity).await
}

/// Remove the identity from the session and discard it (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session_identity(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<SessionIdentity>(keys::CURRENT_CUSTOMER)
        .await?;
    session.flush().await
}

//! Order administration routes.
//!
//! Customers place orders through the product routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use abc_retail_core::{EntityKey, Order, OrderLine, VersionToken};

use crate::error::Result;
use crate::middleware::CurrentSession;
use crate::state::AppState;

/// Body of an order update: the new line and the version it replaces.
#[derive(Debug, Deserialize)]
pub struct OrderEdit {
    #[serde(flatten)]
    pub line: OrderLine,
    pub version: VersionToken,
}

/// GET /orders
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator.
pub async fn index(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.admin().list_orders(identity.as_ref()).await?))
}

/// GET /orders/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 404 for an
/// unknown order.
pub async fn show(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<Json<Order>> {
    let key = EntityKey::new(partition_key, row_key);
    Ok(Json(state.admin().get_order(identity.as_ref(), &key).await?))
}

/// PUT /orders/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator, 400 for an invalid
/// line, 404 for an unknown order and 409 for a stale version.
pub async fn update(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
    Json(edit): Json<OrderEdit>,
) -> Result<Json<Order>> {
    let key = EntityKey::new(partition_key, row_key);
    let order = state
        .admin()
        .update_order(identity.as_ref(), &key, edit.line, &edit.version)
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 404 for an
/// unknown order.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let key = EntityKey::new(partition_key, row_key);
    state.admin().delete_order(identity.as_ref(), &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

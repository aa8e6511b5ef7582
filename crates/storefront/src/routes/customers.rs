//! Customer administration routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use abc_retail_core::{Customer, Email, EntityKey, PartitionKey, RowKey, VersionToken};

use crate::error::Result;
use crate::middleware::CurrentSession;
use crate::services::admin::CustomerUpdate;
use crate::services::auth::RegisterRequest;
use crate::state::AppState;

/// A customer as returned over HTTP, without credentials.
#[derive(Debug, Serialize)]
pub struct CustomerView {
    pub partition_key: PartitionKey,
    pub row_key: RowKey,
    pub version: Option<VersionToken>,
    pub timestamp: Option<DateTime<Utc>>,
    pub customer_id: String,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: Option<String>,
    pub is_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        Self {
            partition_key: customer.meta.partition_key,
            row_key: customer.meta.row_key,
            version: customer.meta.version,
            timestamp: customer.meta.timestamp,
            customer_id: customer.customer_id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
            is_admin: customer.is_admin,
            last_login: customer.last_login,
        }
    }
}

/// Body of a customer update: the new fields and the version they replace.
#[derive(Debug, Deserialize)]
pub struct CustomerEdit {
    #[serde(flatten)]
    pub update: CustomerUpdate,
    pub version: VersionToken,
}

/// GET /customers
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator.
pub async fn index(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
) -> Result<Json<Vec<CustomerView>>> {
    let customers = state.admin().list_customers(identity.as_ref()).await?;
    Ok(Json(customers.into_iter().map(CustomerView::from).collect()))
}

/// POST /customers
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator, 400 for invalid
/// input and 409 if the email is already registered.
pub async fn create(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    let customer = state
        .admin()
        .create_customer(identity.as_ref(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(CustomerView::from(customer))).into_response())
}

/// GET /customers/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 404 for an
/// unknown customer.
pub async fn show(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<Json<CustomerView>> {
    let key = EntityKey::new(partition_key, row_key);
    let customer = state.admin().get_customer(identity.as_ref(), &key).await?;
    Ok(Json(CustomerView::from(customer)))
}

/// PUT /customers/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator, 400 for invalid
/// fields, 404 for an unknown customer and 409 for a stale version.
pub async fn update(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
    Json(edit): Json<CustomerEdit>,
) -> Result<Json<CustomerView>> {
    let admin = state.admin();
    let key = EntityKey::new(partition_key, row_key);
    let mut customer = admin.get_customer(identity.as_ref(), &key).await?;
    edit.update.apply_to(&mut customer);
    let customer = admin
        .update_customer(identity.as_ref(), customer, &edit.version)
        .await?;
    Ok(Json(CustomerView::from(customer)))
}

/// DELETE /customers/{partition_key}/{row_key}
///
/// Also deletes the customer's stored invoices.
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 404 for an
/// unknown customer.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let key = EntityKey::new(partition_key, row_key);
    state.admin().delete_customer(identity.as_ref(), &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

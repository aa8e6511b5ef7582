//! Catalogue routes and order placement.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use abc_retail_core::{EntityKey, OrderLine, Product, VersionToken};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::files::images::content_type;
use crate::middleware::CurrentSession;
use crate::services::admin::ProductInput;
use crate::services::orders::{CreateOrderRequest, InvoiceDocument};
use crate::state::AppState;

/// Body of a product update: the new fields and the version they replace.
#[derive(Debug, Deserialize)]
pub struct ProductEdit {
    #[serde(flatten)]
    pub input: ProductInput,
    pub version: VersionToken,
}

/// Catalogue listing, sorted by name.
///
/// GET /products
///
/// # Errors
///
/// Returns 500 if the catalogue cannot be read.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.admin().list_products().await?))
}

/// GET /products/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 404 for an unknown product.
pub async fn show(
    State(state): State<AppState>,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<Json<Product>> {
    let key = EntityKey::new(partition_key, row_key);
    Ok(Json(state.admin().get_product(&key).await?))
}

/// POST /products
///
/// An `image` field carries a base64 picture to store alongside the product.
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 400 for invalid
/// fields.
pub async fn create(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Json(input): Json<ProductInput>,
) -> Result<Response> {
    let product = state.admin().create_product(identity.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// PUT /products/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator, 400 for invalid
/// fields, 404 for an unknown product and 409 for a stale version.
pub async fn update(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
    Json(edit): Json<ProductEdit>,
) -> Result<Json<Product>> {
    let admin = state.admin();
    let key = EntityKey::new(partition_key, row_key);
    let mut product = admin.get_product(&key).await?;
    let image = edit.input.apply_to(&mut product);
    let product = admin
        .update_product(identity.as_ref(), product, &edit.version, image.as_ref())
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{partition_key}/{row_key}
///
/// # Errors
///
/// Returns 401/403 unless signed in as an administrator and 404 for an
/// unknown product.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let key = EntityKey::new(partition_key, row_key);
    state.admin().delete_product(identity.as_ref(), &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A stored product picture.
///
/// GET /images/{name}
///
/// # Errors
///
/// Returns 404 for an unknown picture.
pub async fn image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let bytes = state.backends().images.download(&name).await?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type(&name)))],
        bytes,
    )
        .into_response())
}

/// Order a product and download the invoice.
///
/// POST /products/{partition_key}/{row_key}/orders
///
/// # Errors
///
/// Returns 401 without a valid session, 404 for an unknown product, 400 for
/// an invalid order line and 500 if the order or invoice cannot be stored.
pub async fn order(
    State(state): State<AppState>,
    CurrentSession(identity): CurrentSession,
    Path((partition_key, row_key)): Path<(String, String)>,
    Json(line): Json<OrderLine>,
) -> Result<Response> {
    let request = CreateOrderRequest {
        product: EntityKey::new(partition_key, row_key),
        size: line.size,
        quantity: line.quantity,
        colour: line.colour,
    };
    let invoice = state
        .orders()
        .create_order(identity.as_ref(), request)
        .await?;
    add_breadcrumb(
        "order",
        "Order placed",
        Some(&[("order_id", invoice.order.order_id.as_str())]),
    );
    invoice_response(invoice)
}

fn invoice_response(invoice: InvoiceDocument) -> Result<Response> {
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        invoice.file_name
    ))
    .map_err(|e| AppError::Internal(format!("invoice file name: {e}")))?;
    Ok((
        StatusCode::CREATED,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(invoice.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        invoice.bytes,
    )
        .into_response())
}

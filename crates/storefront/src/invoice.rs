//! Invoice rendering.
//!
//! Invoices are printable HTML documents rendered from [`InvoiceData`]. The
//! generation time is an explicit input so identical inputs always produce
//! identical bytes.

use askama::Template;
use chrono::{DateTime, Utc};
use thiserror::Error;

use abc_retail_core::{InvoiceData, PriceError, format_amount};

/// Content type invoices are served and downloaded with.
pub const INVOICE_CONTENT_TYPE: &str = "application/octet-stream";

/// File extension of rendered invoices.
pub const INVOICE_EXTENSION: &str = "html";

/// Invoice template.
#[derive(Template)]
#[template(path = "invoice.html")]
struct InvoiceTemplate<'a> {
    title: &'a str,
    customer_name: &'a str,
    email: &'a str,
    phone: &'a str,
    address: &'a str,
    order_date: String,
    product_name: &'a str,
    description: &'a str,
    size: i32,
    colour: &'a str,
    quantity: i32,
    unit_price: String,
    total: String,
    generated_on: String,
}

/// Errors raised while rendering an invoice.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invoice template failed: {0}")]
    Template(#[from] askama::Error),

    #[error("invoice total: {0}")]
    Total(#[from] PriceError),
}

/// Render the invoice document for `data`.
///
/// # Errors
///
/// Returns `RenderError::Total` if the line total is out of range and
/// `RenderError::Template` if the template cannot be rendered.
pub fn render_invoice(
    data: &InvoiceData,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, RenderError> {
    let template = InvoiceTemplate {
        title: &data.title,
        customer_name: &data.customer_name,
        email: &data.email,
        phone: &data.phone,
        address: data.address.as_deref().unwrap_or_default(),
        order_date: data.order_date.format("%B %d, %Y").to_string(),
        product_name: &data.product_name,
        description: &data.description,
        size: data.size,
        colour: &data.colour,
        quantity: data.quantity,
        unit_price: data.price.display(),
        total: format_amount(data.total()?),
        generated_on: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };
    Ok(template.render()?.into_bytes())
}

/// File name the invoice for `data` is stored under.
#[must_use]
pub fn invoice_file_name(data: &InvoiceData) -> String {
    data.file_name(INVOICE_EXTENSION)
}

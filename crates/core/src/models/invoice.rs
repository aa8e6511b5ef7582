//! Invoice content.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Customer, Order, Product};
use crate::types::{Price, PriceError};

/// Everything printed on an invoice for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub title: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub order_date: DateTime<Utc>,
    pub product_name: String,
    pub description: String,
    pub price: Price,
    pub size: i32,
    pub quantity: i32,
    pub colour: String,
}

impl InvoiceData {
    /// Store name printed as the document title.
    pub const DEFAULT_TITLE: &'static str = "ABC Retail";

    /// Combine the three records of a freshly placed order.
    #[must_use]
    pub fn for_order(
        customer: &Customer,
        product: &Product,
        order: &Order,
        order_date: DateTime<Utc>,
    ) -> Self {
        Self {
            title: Self::DEFAULT_TITLE.to_owned(),
            customer_name: customer.name.clone(),
            email: customer.email.to_string(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            order_date,
            product_name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            size: order.size,
            quantity: order.quantity,
            colour: order.colour.clone(),
        }
    }

    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total is out of range.
    pub fn total(&self) -> Result<Decimal, PriceError> {
        self.price.total(self.quantity)
    }

    /// Deterministic file name derived from customer and product names.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        invoice_file_name(&self.customer_name, &self.product_name, extension)
    }
}

/// Longest customer or product part kept in an invoice file name, so the
/// whole name stays well inside the 255-byte file name limit.
pub const MAX_FILE_NAME_PART: usize = 100;

/// `{customer}_{product}_Invoice.{extension}` with characters that are unsafe
/// in a file name replaced by `_` and each part cut to
/// [`MAX_FILE_NAME_PART`] characters.
#[must_use]
pub fn invoice_file_name(customer_name: &str, product_name: &str, extension: &str) -> String {
    format!(
        "{}_{}_Invoice.{extension}",
        sanitize(customer_name),
        sanitize(product_name)
    )
}

fn sanitize(part: &str) -> String {
    let cleaned: String = part
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // A leading dot would hide the file or form `..`.
    cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILE_NAME_PART)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(
            invoice_file_name("Thandi M", "Runner", "html"),
            "Thandi M_Runner_Invoice.html"
        );
        assert_eq!(
            invoice_file_name("../etc", "a/b", "html"),
            "_etc_a_b_Invoice.html"
        );
    }

    #[test]
    fn test_long_names_are_shortened() {
        let customer = "C".repeat(300);
        let product = "P".repeat(300);
        let name = invoice_file_name(&customer, &product, "html");
        assert_eq!(
            name,
            format!(
                "{}_{}_Invoice.html",
                "C".repeat(MAX_FILE_NAME_PART),
                "P".repeat(MAX_FILE_NAME_PART)
            )
        );
        assert!(name.len() <= 255);
    }
}

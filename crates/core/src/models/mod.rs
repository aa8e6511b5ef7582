//! Stored record types and the values derived from them.
//!
//! - [`Customer`] - shopper account, including credentials and session state
//! - [`Product`] - catalogue item
//! - [`Order`] - one order line, referencing customer and product by business ID
//! - [`InvoiceData`] - everything printed on an invoice
//! - [`AuditEvent`] - record appended to the audit queue

pub mod audit;
pub mod customer;
pub mod invoice;
pub mod order;
pub mod product;

pub use audit::AuditEvent;
pub use customer::Customer;
pub use invoice::InvoiceData;
pub use order::{Order, OrderLine};
pub use product::Product;

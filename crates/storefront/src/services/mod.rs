//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login, sessions and the admin guard
//! - `orders` - The order creation workflow that produces an invoice
//! - `admin` - Catalogue, customer and order administration
//!
//! Services borrow the shared [`Backends`](crate::backends::Backends) and are
//! cheap to construct per request.

pub mod admin;
pub mod auth;
pub mod orders;

use abc_retail_core::AuditEvent;

use crate::queue::{EventQueue, publish};

/// Append an audit event, logging instead of failing when the queue is down.
///
/// Audit records are best effort: the operation they describe has already
/// been committed by the time they are written.
pub(crate) async fn record_audit(queue: &dyn EventQueue, event: &AuditEvent) {
    if let Err(error) = publish(queue, event).await {
        tracing::warn!(
            error = %error,
            queue = queue.name(),
            action = %event.action,
            description = %event.description,
            "Audit event was not recorded"
        );
    }
}

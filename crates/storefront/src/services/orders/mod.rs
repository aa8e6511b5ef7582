//! Order creation workflow.
//!
//! Creating an order touches four independent backends with no transaction
//! spanning them. The stages run strictly in order and the first fatal
//! failure is returned to the caller:
//!
//! | Stage              | Failure                                    | State left behind                     |
//! |--------------------|--------------------------------------------|---------------------------------------|
//! | 1 Authorize        | `Unauthorized`                             | nothing                               |
//! | 2 Load customer    | `NotFound`, `Unauthorized`                 | nothing                               |
//! | 3 Load product     | `NotFound`                                 | nothing                               |
//! | 4 Persist order    | `Validation`, `Conflict`, `StorageFailure` | nothing                               |
//! | 5 Publish event    | logged, not fatal                          | order without audit record            |
//! | 6 Render invoice   | `Validation`                               | order and audit record                |
//! | 7 Persist invoice  | `StorageFailure`                           | order, possibly an empty invoice file |
//! | 8 Return invoice   | `NotFound`, `StorageFailure`               | order and stored invoice              |
//!
//! Nothing is rolled back: an order persisted in stage 4 stays persisted when
//! a later stage fails.

mod error;

pub use error::OrderError;

use std::fmt;

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use abc_retail_core::{AuditEvent, Customer, EntityKey, InvoiceData, Order, OrderLine, Product};

use super::auth::session_matches;
use crate::backends::Backends;
use crate::invoice::{INVOICE_CONTENT_TYPE, invoice_file_name, render_invoice};
use crate::models::SessionIdentity;
use crate::queue::publish;

/// What the customer asked for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateOrderRequest {
    pub product: EntityKey,
    pub size: i32,
    pub quantity: i32,
    pub colour: String,
}

/// The stored invoice handed back to the customer.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub directory: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub order: Order,
}

/// Workflow stages, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStage {
    Authorize,
    LoadCustomer,
    LoadProduct,
    PersistOrder,
    PublishEvent,
    RenderInvoice,
    PersistInvoice,
    ReturnInvoice,
}

impl fmt::Display for OrderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authorize => "authorize",
            Self::LoadCustomer => "load_customer",
            Self::LoadProduct => "load_product",
            Self::PersistOrder => "persist_order",
            Self::PublishEvent => "publish_event",
            Self::RenderInvoice => "render_invoice",
            Self::PersistInvoice => "persist_invoice",
            Self::ReturnInvoice => "return_invoice",
        };
        f.write_str(name)
    }
}

/// Directory a customer's invoices are stored in.
///
/// Derived from the customer's storage key so every customer gets a
/// directory of their own.
#[must_use]
pub fn invoice_directory(customer: &Customer) -> String {
    format!("{}-{}", customer.meta.partition_key, customer.meta.row_key)
}

/// The order creation workflow.
pub struct OrderWorkflow<'a> {
    backends: &'a Backends,
}

impl<'a> OrderWorkflow<'a> {
    #[must_use]
    pub const fn new(backends: &'a Backends) -> Self {
        Self { backends }
    }

    /// Place an order and return its invoice.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage failure; see the module documentation
    /// for what each failure leaves behind.
    #[instrument(skip(self, session, request), fields(product = %request.product))]
    pub async fn create_order(
        &self,
        session: Option<&SessionIdentity>,
        request: CreateOrderRequest,
    ) -> Result<InvoiceDocument, OrderError> {
        let session = session
            .ok_or(OrderError::Unauthorized)
            .inspect_err(|e| log_failure(OrderStage::Authorize, e))?;

        let customer = self
            .load_customer(session)
            .await
            .inspect_err(|e| log_failure(OrderStage::LoadCustomer, e))?;

        let product = self
            .backends
            .products
            .get(&request.product.partition_key, &request.product.row_key)
            .await
            .map_err(OrderError::from)
            .inspect_err(|e| log_failure(OrderStage::LoadProduct, e))?;

        let order = self
            .persist_order(&customer, &product, request)
            .await
            .inspect_err(|e| log_failure(OrderStage::PersistOrder, e))?;
        tracing::info!(order_id = %order.order_id, "Order persisted");

        if let Err(error) = publish(
            self.backends.audit.as_ref(),
            &AuditEvent::order_created(&order.order_id),
        )
        .await
        {
            tracing::warn!(
                stage = %OrderStage::PublishEvent,
                order_id = %order.order_id,
                error = %error,
                "Order audit event was not recorded"
            );
        }

        let order_date = order.meta.timestamp.unwrap_or_else(Utc::now);
        let invoice = InvoiceData::for_order(&customer, &product, &order, order_date);
        let bytes = render_invoice(&invoice, Utc::now())
            .map_err(OrderError::from)
            .inspect_err(|e| log_orphaned(OrderStage::RenderInvoice, &order, e))?;

        let directory = invoice_directory(&customer);
        let file_name = invoice_file_name(&invoice);
        self.backends
            .documents
            .upload_file(&directory, &file_name, &bytes)
            .await
            .map_err(OrderError::from)
            .inspect_err(|e| log_orphaned(OrderStage::PersistInvoice, &order, e))?;

        let bytes = self
            .backends
            .documents
            .download_file(&directory, &file_name)
            .await
            .map_err(OrderError::from)
            .inspect_err(|e| log_orphaned(OrderStage::ReturnInvoice, &order, e))?;

        tracing::info!(order_id = %order.order_id, %directory, %file_name, "Invoice issued");
        Ok(InvoiceDocument {
            directory,
            file_name,
            content_type: INVOICE_CONTENT_TYPE,
            bytes,
            order,
        })
    }

    async fn load_customer(&self, session: &SessionIdentity) -> Result<Customer, OrderError> {
        let key = &session.customer;
        let customer = self
            .backends
            .customers
            .get(&key.partition_key, &key.row_key)
            .await?;
        if !session_matches(&customer, session) {
            return Err(OrderError::Unauthorized);
        }
        Ok(customer)
    }

    async fn persist_order(
        &self,
        customer: &Customer,
        product: &Product,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError> {
        let line = OrderLine {
            size: request.size,
            quantity: request.quantity,
            colour: request.colour,
        };
        line.validate()?;
        // The invoice total must be printable before anything is stored.
        product
            .price
            .total(line.quantity)
            .map_err(|e| OrderError::Validation(format!("quantity: {e}")))?;
        let order = Order::place(&customer.customer_id, &product.product_id, line);
        Ok(self.backends.orders.add(order).await?)
    }
}

fn log_failure(stage: OrderStage, error: &OrderError) {
    tracing::info!(%stage, %error, "Order rejected");
}

fn log_orphaned(stage: OrderStage, order: &Order, error: &OrderError) {
    tracing::error!(
        %stage,
        order_id = %order.order_id,
        %error,
        "Order persisted without a retrievable invoice"
    );
}

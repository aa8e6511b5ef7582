//! Orders.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityMetadata;
use crate::impl_entity;
use crate::types::{PartitionKey, RowKey};
use crate::validation::{ValidationError, positive};

/// The customer-chosen part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub size: i32,
    pub quantity: i32,
    pub colour: String,
}

impl OrderLine {
    /// Size and quantity must be positive and a colour must be given.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("size", self.size)?;
        positive("quantity", self.quantity)?;
        if self.colour.trim().is_empty() {
            return Err(ValidationError::new("colour", "is required"));
        }
        Ok(())
    }
}

/// A placed order.
///
/// Customer and product are referenced by denormalized business IDs; the
/// store does not enforce that they exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    pub meta: EntityMetadata,
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub size: i32,
    pub quantity: i32,
    pub colour: String,
}

impl_entity!(
    Order,
    "order",
    ["order_id", "customer_id", "product_id", "size", "quantity", "colour"]
);

impl Order {
    /// Build a new order with fresh partition key, row key and order ID.
    #[must_use]
    pub fn place(customer_id: &str, product_id: &str, line: OrderLine) -> Self {
        Self {
            meta: EntityMetadata::new(PartitionKey::generate(), RowKey::generate()),
            order_id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_owned(),
            product_id: product_id.to_owned(),
            size: line.size,
            quantity: line.quantity,
            colour: line.colour.trim().to_owned(),
        }
    }

    #[must_use]
    pub fn line(&self) -> OrderLine {
        OrderLine {
            size: self.size,
            quantity: self.quantity,
            colour: self.colour.clone(),
        }
    }

    /// Replace the customer-chosen fields.
    pub fn apply_line(&mut self, line: OrderLine) {
        self.size = line.size;
        self.quantity = line.quantity;
        self.colour = line.colour.trim().to_owned();
    }
}

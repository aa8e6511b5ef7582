//! ABC Retail Core - Shared types library.
//!
//! This crate provides the types used across all ABC Retail components:
//! - `storefront` - entity/queue/document stores, auth, the order workflow and the HTTP surface
//! - `cli` - Command-line tools for provisioning and account management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for storage keys, version tokens, prices and emails
//! - [`entity`] - The [`Entity`] capability shared by every stored record type
//! - [`models`] - Customer, product and order records, invoice data, audit events
//! - [`filter`] - Query predicates and their in-memory evaluation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod entity;
pub mod filter;
pub mod models;
pub mod types;
pub mod validation;

pub use entity::{Entity, EntityMetadata};
pub use filter::{CompareOp, Filter, FilterError};
pub use models::{AuditEvent, Customer, InvoiceData, Order, OrderLine, Product};
pub use types::*;
pub use validation::ValidationError;

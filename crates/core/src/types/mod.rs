//! Core value types for ABC Retail.
//!
//! This module provides type-safe wrappers for storage keys, prices and
//! email addresses.

pub mod email;
pub mod key;
pub mod price;

pub use email::{Email, EmailError};
pub use key::{EntityKey, PartitionKey, RowKey, VersionToken};
pub use price::{Price, PriceError, format_amount};

//! Storefront-specific models.
//!
//! Shared entity types live in `abc_retail_core`; this module holds the
//! types that only make sense inside the storefront process.

pub mod session;

pub use session::SessionIdentity;

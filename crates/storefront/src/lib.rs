//! ABC Retail storefront library.
//!
//! Storage backends, the authentication, ordering and administration
//! services, and the HTTP surface over them. Exposed as a library so the
//! binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backends;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod invoice;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod routes;
pub mod services;
pub mod state;

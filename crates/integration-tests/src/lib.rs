//! Integration test support for ABC Retail.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests over the in-memory backends
//! cargo test -p abc-retail-integration-tests
//!
//! # Include the PostgreSQL tests
//! STOREFRONT_DATABASE_URL=postgres://... cargo test -p abc-retail-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_workflow` - Order creation end to end, including partial failures
//! - `auth` - Registration, login, logout and session validity
//! - `http_api` - The HTTP surface with cookie sessions
//! - `postgres_store` - The `PostgreSQL` backends (ignored by default)

#![allow(clippy::missing_panics_doc)]

use std::path::PathBuf;

use axum::Router;
use secrecy::SecretString;
use tower_sessions::MemoryStore;

use abc_retail_core::{Customer, Entity, Price, Product};
use abc_retail_storefront::backends::{Backends, MemoryBackends};
use abc_retail_storefront::config::{ContainerNames, StorefrontConfig};
use abc_retail_storefront::db::{EntityStore, expected_version};
use abc_retail_storefront::middleware::session_layer;
use abc_retail_storefront::models::SessionIdentity;
use abc_retail_storefront::routes;
use abc_retail_storefront::services::admin::AdminService;
use abc_retail_storefront::services::auth::{AuthService, RegisterRequest};
use abc_retail_storefront::services::orders::OrderWorkflow;
use abc_retail_storefront::state::AppState;

/// Password every fixture account is registered with.
pub const PASSWORD: &str = "sneakers4life";

/// Configuration for in-process tests. Nothing in it is dialled.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/abc_retail_test"),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        containers: ContainerNames::default(),
        file_share_root: PathBuf::from("./data/share"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A registration form with valid fields.
#[must_use]
pub fn registration(name: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_owned(),
        email: email.to_owned(),
        phone: "0821234567".to_owned(),
        address: Some("12 Long Street, Cape Town".to_owned()),
        password: PASSWORD.to_owned(),
        confirm_password: PASSWORD.to_owned(),
    }
}

/// In-memory backends plus fixture helpers.
pub struct TestContext {
    pub memory: MemoryBackends,
    pub backends: Backends,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        Self { memory, backends }
    }

    #[must_use]
    pub const fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.backends)
    }

    #[must_use]
    pub const fn orders(&self) -> OrderWorkflow<'_> {
        OrderWorkflow::new(&self.backends)
    }

    #[must_use]
    pub const fn admin(&self) -> AdminService<'_> {
        AdminService::new(&self.backends)
    }

    /// Register a customer and return it with its session.
    pub async fn register(&self, name: &str, email: &str) -> (Customer, SessionIdentity) {
        let customer = self
            .auth()
            .register(registration(name, email))
            .await
            .expect("registration failed");
        let session = SessionIdentity::for_customer(&customer).expect("no session token");
        (customer, session)
    }

    /// Register a customer and grant it the administrator role.
    pub async fn register_admin(&self, name: &str, email: &str) -> (Customer, SessionIdentity) {
        let (customer, session) = self.register(name, email).await;
        let version = expected_version(&customer).expect("stored customer has a version");
        let mut promoted = customer;
        promoted.is_admin = true;
        let promoted = self
            .memory
            .customers
            .update(promoted, &version)
            .await
            .expect("promotion failed");
        (promoted, session)
    }

    /// Put a product straight into the catalogue.
    pub async fn seed_product(&self, name: &str, price: f64) -> Product {
        let product = Product::new(
            format!("{}001", name.to_uppercase()),
            name,
            format!("{name} sneaker for everyday wear"),
            Price::try_from(price).expect("valid price"),
            None,
        );
        let product = self
            .memory
            .products
            .add(product)
            .await
            .expect("seeding product failed");
        assert!(product.version().is_some());
        product
    }

    /// The full HTTP router over these backends, with in-memory sessions.
    #[must_use]
    pub fn app(&self) -> Router {
        let state = AppState::new(test_config(), self.backends.clone(), None);
        routes::routes()
            .layer(session_layer(MemoryStore::default(), false))
            .with_state(state)
    }
}

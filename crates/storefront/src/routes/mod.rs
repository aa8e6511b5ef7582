//! HTTP route handlers for storefront.
//!
//! All bodies are JSON except the invoice download and product pictures.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (database)
//!
//! # Auth
//! POST /auth/register                  - Register and sign in
//! POST /auth/login                     - Sign in
//! POST /auth/logout                    - Sign out
//! GET  /auth/me                        - Signed-in customer
//!
//! # Products
//! GET  /products                       - Catalogue listing
//! POST /products                       - Create product (admin)
//! GET  /products/{pk}/{rk}             - Product detail
//! PUT  /products/{pk}/{rk}             - Update product (admin)
//! DELETE /products/{pk}/{rk}           - Delete product (admin)
//! POST /products/{pk}/{rk}/orders      - Place order, download invoice
//! GET  /images/{name}                  - Stored product picture
//!
//! # Customers (admin)
//! GET  /customers                      - Customer listing
//! POST /customers                      - Create customer
//! GET|PUT|DELETE /customers/{pk}/{rk}  - Customer detail, update, delete
//!
//! # Orders (admin)
//! GET  /orders                         - Order listing
//! GET|PUT|DELETE /orders/{pk}/{rk}     - Order detail, update, delete
//! ```

pub mod auth;
pub mod customers;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{partition_key}/{row_key}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/{partition_key}/{row_key}/orders", post(products::order))
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::index).post(customers::create))
        .route(
            "/{partition_key}/{row_key}",
            get(customers::show)
                .put(customers::update)
                .delete(customers::destroy),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::index)).route(
        "/{partition_key}/{row_key}",
        get(orders::show)
            .put(orders::update)
            .delete(orders::destroy),
    )
}

/// Create all routes for the storefront.
///
/// Handlers that touch the session need a session layer around the router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .route("/images/{name}", get(products::image))
        .nest("/customers", customer_routes())
        .nest("/orders", order_routes())
}

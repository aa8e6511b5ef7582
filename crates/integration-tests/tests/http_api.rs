//! The HTTP surface, driven through the router with cookie sessions.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tower::ServiceExt;

use abc_retail_integration_tests::{PASSWORD, TestContext};
use abc_retail_storefront::invoice::INVOICE_CONTENT_TYPE;

/// Send a request, optionally with a session cookie and a JSON body.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// The `name=value` part of the session cookie set by a response.
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("abc_session="));
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn registration_body(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "phone": "0821234567",
        "address": "12 Long Street, Cape Town",
        "password": PASSWORD,
        "confirm_password": PASSWORD,
    })
}

async fn login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestContext::new().app();

    let response = send(&app, "GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");

    let response = send(&app, "GET", "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_then_order_downloads_invoice() {
    let ctx = TestContext::new();
    let product = ctx.seed_product("Runner", 100.0).await;
    let app = ctx.app();

    let response = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(registration_body("Thandi Mokoena", "thandi@example.com")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response);
    let view = body_json(response).await;
    assert_eq!(view["email"], "thandi@example.com");
    assert!(view.get("password_hash").is_none());
    assert!(view.get("session_token").is_none());

    let response = send(&app, "GET", "/auth/me", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Thandi Mokoena");

    let uri = format!(
        "/products/{}/{}/orders",
        product.meta.partition_key, product.meta.row_key
    );
    let response = send(
        &app,
        "POST",
        &uri,
        Some(&cookie),
        Some(json!({ "size": 9, "quantity": 2, "colour": "red" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        INVOICE_CONTENT_TYPE
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Thandi Mokoena_Runner_Invoice.html\""
    );
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Total: $200.00"));
    assert_eq!(ctx.memory.orders.len().await, 1);
}

#[tokio::test]
async fn test_order_requires_session() {
    let ctx = TestContext::new();
    let product = ctx.seed_product("Runner", 100.0).await;
    let app = ctx.app();

    let uri = format!(
        "/products/{}/{}/orders",
        product.meta.partition_key, product.meta.row_key
    );
    let response = send(
        &app,
        "POST",
        &uri,
        None,
        Some(json!({ "size": 9, "quantity": 1, "colour": "red" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(ctx.memory.orders.is_empty().await);
}

#[tokio::test]
async fn test_error_statuses() {
    let ctx = TestContext::new();
    ctx.register("Sipho Dlamini", "sipho@example.com").await;
    let app = ctx.app();

    let response = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "sipho@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(registration_body("Sipho Again", "sipho@example.com")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, "GET", "/products/Sneaker/missing", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalogue_administration_requires_admin() {
    let ctx = TestContext::new();
    ctx.register("Sipho Dlamini", "sipho@example.com").await;
    ctx.register_admin("Admin User", "admin@example.com").await;
    let app = ctx.app();
    let product = json!({
        "name": "Trail",
        "description": "Grippy trail sneaker",
        "price": 149.99,
    });

    let response = send(&app, "POST", "/products", None, Some(product.clone())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let shopper = login(&app, "sipho@example.com").await;
    let response = send(&app, "POST", "/products", Some(&shopper), Some(product.clone())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = login(&app, "admin@example.com").await;
    let response = send(&app, "POST", "/products", Some(&admin), Some(product)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["partition_key"], "Sneaker");

    let response = send(&app, "GET", "/products", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);

    // Customer administration is also closed to shoppers.
    let response = send(&app, "GET", "/customers", Some(&shopper), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = send(&app, "GET", "/customers", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let ctx = TestContext::new();
    ctx.register_admin("Admin User", "admin@example.com").await;
    let product = ctx.seed_product("Runner", 100.0).await;
    let app = ctx.app();
    let admin = login(&app, "admin@example.com").await;
    let uri = format!(
        "/products/{}/{}",
        product.meta.partition_key, product.meta.row_key
    );
    let edit = |price: f64| {
        json!({
            "name": "Runner",
            "description": "Runner sneaker for everyday wear",
            "price": price,
            "version": product.meta.version,
        })
    };

    let response = send(&app, "PUT", &uri, Some(&admin), Some(edit(90.0))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["price"], 90.0);

    let response = send(&app, "PUT", &uri, Some(&admin), Some(edit(80.0))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_product_image_upload_is_served_and_removed() {
    let ctx = TestContext::new();
    ctx.register_admin("Admin User", "admin@example.com").await;
    let app = ctx.app();
    let admin = login(&app, "admin@example.com").await;
    let product = json!({
        "name": "Trail",
        "description": "Grippy trail sneaker",
        "price": 149.99,
        "image": {
            "file_name": "trail.png",
            "content_base64": STANDARD.encode(b"\x89PNG trail"),
        },
    });

    let response = send(&app, "POST", "/products", Some(&admin), Some(product)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let image_url = created["image_url"].as_str().unwrap().to_owned();
    assert!(image_url.starts_with("/images/"));

    let response = send(&app, "GET", &image_url, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, b"\x89PNG trail");

    let uri = format!(
        "/products/{}/{}",
        created["partition_key"].as_str().unwrap(),
        created["row_key"].as_str().unwrap()
    );
    let response = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, "GET", &image_url, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_image_with_bad_extension_is_rejected() {
    let ctx = TestContext::new();
    ctx.register_admin("Admin User", "admin@example.com").await;
    let app = ctx.app();
    let admin = login(&app, "admin@example.com").await;
    let product = json!({
        "name": "Trail",
        "description": "Grippy trail sneaker",
        "price": 149.99,
        "image": { "file_name": "trail.gif", "content_base64": STANDARD.encode(b"GIF89a") },
    });

    let response = send(&app, "POST", "/products", Some(&admin), Some(product)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.memory.products.is_empty().await);
    assert_eq!(ctx.memory.documents.file_count().await, 0);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let ctx = TestContext::new();
    ctx.register("Sipho Dlamini", "sipho@example.com").await;
    let app = ctx.app();
    let cookie = login(&app, "sipho@example.com").await;

    let response = send(&app, "POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", "/auth/me", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

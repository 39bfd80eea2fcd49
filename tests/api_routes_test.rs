mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &axum::Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}

fn authed_post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn api_requires_authentication() {
    let ctx = common::setup().await;
    let app = common::test_app(&ctx);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "login@example.com", "right-password").await;
    let app = common::test_app(&ctx);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "login@example.com", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transaction_flow_over_http() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "flow@example.com", "pw-flow-12345").await;
    let item = common::seed_product(&ctx, "HTTP-001", 10, 5).await;
    let app = common::test_app(&ctx);

    let token = login(&app, "flow@example.com", "pw-flow-12345").await;

    // Record an OUT that drains the stock exactly.
    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/transactions",
            &token,
            json!({
                "type": "OUT",
                "product_id": item.id,
                "quantity": 10,
                "unit_price": "2.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["type"], "OUT");
    assert_eq!(created["quantity"], 10);
    assert_eq!(created["total_price"], "20.00");
    assert_eq!(created["product"]["sku"], "HTTP-001");
    assert_eq!(created["user"]["email"], "flow@example.com");

    // A further OUT is now insufficient.
    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/transactions",
            &token,
            json!({
                "type": "OUT",
                "product_id": item.id,
                "quantity": 1,
                "unit_price": "2.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Insufficient stock for this transaction");

    // The list shows the single committed movement with projections.
    let response = app
        .clone()
        .oneshot(authed_get(
            &format!("/api/v1/transactions?product_id={}", item.id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["pages"], 1);
    assert_eq!(body["transactions"][0]["product"]["name"], "Product HTTP-001");
}

#[tokio::test]
async fn transaction_validation_returns_field_errors() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "valid@example.com", "pw-valid-1234").await;
    let item = common::seed_product(&ctx, "HTTP-002", 10, 5).await;
    let app = common::test_app(&ctx);

    let token = login(&app, "valid@example.com", "pw-valid-1234").await;

    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/transactions",
            &token,
            json!({
                "type": "IN",
                "product_id": item.id,
                "quantity": 0,
                "unit_price": "1.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let errors = body["errors"].as_array().unwrap();
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().starts_with("quantity:")));
}

#[tokio::test]
async fn transaction_against_unknown_product_is_404() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "missing@example.com", "pw-miss-12345").await;
    let app = common::test_app(&ctx);

    let token = login(&app, "missing@example.com", "pw-miss-12345").await;

    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/transactions",
            &token,
            json!({
                "type": "IN",
                "product_id": Uuid::new_v4(),
                "quantity": 1,
                "unit_price": "1.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_type_filter_is_400() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "filter@example.com", "pw-filt-12345").await;
    let app = common::test_app(&ctx);

    let token = login(&app, "filter@example.com", "pw-filt-12345").await;

    let response = app
        .clone()
        .oneshot(authed_get("/api/v1/transactions?type=TRANSFER", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_crud_and_dashboard_over_http() {
    let ctx = common::setup().await;
    common::seed_user(&ctx, "crud@example.com", "pw-crud-12345").await;
    let app = common::test_app(&ctx);

    let token = login(&app, "crud@example.com", "pw-crud-12345").await;

    // Category, then a product inside it.
    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/categories",
            &token,
            json!({ "name": "Electronics", "description": "Devices" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let category = body_json(response).await;

    // Duplicate category name is rejected.
    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/categories",
            &token,
            json!({ "name": "Electronics" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Category name already exists");

    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/products",
            &token,
            json!({
                "name": "Business Laptop",
                "sku": "LAPTOP-001",
                "price": "1299.99",
                "cost": "899.99",
                "quantity": 3,
                "min_stock": 5,
                "category_id": category["id"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = body_json(response).await;
    assert_eq!(product["category"]["name"], "Electronics");

    // Duplicate SKU is rejected.
    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/products",
            &token,
            json!({
                "name": "Another",
                "sku": "LAPTOP-001",
                "price": "1.00",
                "cost": "1.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "SKU already exists");

    // Low-stock filter finds the product (3 <= 5).
    let response = app
        .clone()
        .oneshot(authed_get("/api/v1/products?low_stock=true", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["products"][0]["sku"], "LAPTOP-001");

    // Dashboard aggregates reflect the single product.
    let response = app
        .clone()
        .oneshot(authed_get("/api/v1/dashboard/stats", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["low_stock_products"], 1);
    assert_eq!(stats["total_categories"], 1);
    assert_eq!(stats["inventory_value"], "2699.97");

    // Soft delete hides it from lists and from the ledger.
    let product_id = product["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/products/{}", product_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed_get("/api/v1/products", &token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 0);

    let response = app
        .clone()
        .oneshot(authed_post(
            "/api/v1/transactions",
            &token,
            json!({
                "type": "IN",
                "product_id": product_id,
                "quantity": 1,
                "unit_price": "1.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoint_reports_database() {
    let ctx = common::setup().await;
    let app = common::test_app(&ctx);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"], "up");
}

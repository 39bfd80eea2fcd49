//! Shared test harness: in-memory database, seeded rows, app wiring.

#![allow(dead_code)]

use axum::Router;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use stockroom_api as api;

use api::entities::{product, user};
use api::events::EventSender;
use api::handlers::AppServices;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

pub struct TestContext {
    pub db: Arc<api::db::DbPool>,
    pub services: AppServices,
    pub auth_service: Arc<api::auth::AuthService>,
    pub config: api::config::AppConfig,
    pub event_sender: EventSender,
}

/// Fresh in-memory database with migrations applied and services built.
pub async fn setup() -> TestContext {
    let config = api::config::AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        "127.0.0.1".to_string(),
        0,
    );

    let pool = api::db::establish_connection_from_app_config(&config)
        .await
        .expect("db connect");
    api::db::run_migrations(&pool).await.expect("migrations");

    let db = Arc::new(pool);
    let (tx, rx) = mpsc::channel(100);
    let event_sender = EventSender::new(tx);
    tokio::spawn(api::events::process_events(rx));

    let services = AppServices::new(db.clone(), event_sender.clone());

    let auth_cfg = api::auth::AuthConfig::new(
        TEST_JWT_SECRET.to_string(),
        "stockroom-auth".to_string(),
        "stockroom-api".to_string(),
        Duration::from_secs(3600),
        Duration::from_secs(86400),
    );
    let auth_service = Arc::new(api::auth::AuthService::new(auth_cfg, db.clone()));

    TestContext {
        db,
        services,
        auth_service,
        config,
        event_sender,
    }
}

/// Full router wired like the production binary, minus the network layers.
pub fn test_app(ctx: &TestContext) -> Router {
    let app_state = api::AppState {
        db: ctx.db.clone(),
        config: ctx.config.clone(),
        event_sender: ctx.event_sender.clone(),
        services: ctx.services.clone(),
    };

    Router::new()
        .merge(api::handlers::health::health_routes())
        .nest("/api/v1", api::api_v1_routes())
        .nest(
            "/auth",
            api::auth::auth_routes().with_state(ctx.auth_service.clone()),
        )
        .layer(axum::middleware::from_fn_with_state(
            ctx.auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<api::auth::AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(app_state)
}

pub async fn seed_user(ctx: &TestContext, email: &str, password: &str) -> user::Model {
    let password_hash = api::auth::hash_password(password).expect("hash");
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set("Test User".to_string()),
        password_hash: Set(password_hash),
        role: Set("USER".to_string()),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("seed user")
}

pub async fn seed_product(
    ctx: &TestContext,
    sku: &str,
    quantity: i32,
    min_stock: i32,
) -> product::Model {
    seed_product_with_cost(ctx, sku, quantity, min_stock, Decimal::new(450, 2)).await
}

pub async fn seed_product_with_cost(
    ctx: &TestContext,
    sku: &str,
    quantity: i32,
    min_stock: i32,
    cost: Decimal,
) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Product {}", sku)),
        description: Set(None),
        sku: Set(sku.to_string()),
        barcode: Set(None),
        price: Set(Decimal::new(999, 2)),
        cost: Set(cost),
        quantity: Set(quantity),
        min_stock: Set(min_stock),
        max_stock: Set(None),
        location: Set(None),
        category_id: Set(None),
        supplier_id: Set(None),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("seed product")
}

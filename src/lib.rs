//! Stockroom API Library
//!
//! Inventory and stock-movement tracking: products, categories, suppliers,
//! an append-only transaction ledger over product quantities, and a
//! dashboard summarizing aggregate state.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use auth::AuthRouterExt;
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// All business routes; every route in here sits behind the auth gate.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/transactions", handlers::transactions::transaction_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/categories", handlers::categories::category_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest("/dashboard", handlers::dashboard::dashboard_routes())
        .with_auth()
}

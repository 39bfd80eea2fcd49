pub mod categories;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod suppliers;
pub mod transactions;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    categories::CategoryService, dashboard::DashboardService, products::ProductService,
    suppliers::SupplierService, transactions::TransactionService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transactions: Arc<TransactionService>,
    pub products: Arc<ProductService>,
    pub categories: Arc<CategoryService>,
    pub suppliers: Arc<SupplierService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let transactions = Arc::new(TransactionService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let products = Arc::new(ProductService::new(db_pool.clone(), event_sender.clone()));
        let categories = Arc::new(CategoryService::new(db_pool.clone(), event_sender.clone()));
        let suppliers = Arc::new(SupplierService::new(db_pool.clone(), event_sender));
        let dashboard = Arc::new(DashboardService::new(db_pool));

        Self {
            transactions,
            products,
            categories,
            suppliers,
            dashboard,
        }
    }
}

use crate::{
    db::DbPool,
    entities::{category, product, stock_transaction, supplier},
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Aggregate state shown on the dashboard landing page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: u64,
    pub low_stock_products: u64,
    pub total_suppliers: u64,
    pub total_categories: u64,
    /// Transactions recorded in the last 7 days
    pub recent_transactions: u64,
    /// Σ quantity × cost over active products
    pub inventory_value: Decimal,
    pub total_quantity: i64,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = self.db.as_ref();

        let active_products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let total_products = active_products.len() as u64;
        let low_stock_products = active_products.iter().filter(|p| p.is_low_stock()).count() as u64;
        let inventory_value = active_products
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc + Decimal::from(p.quantity) * p.cost);
        let total_quantity = active_products.iter().map(|p| p.quantity as i64).sum();

        let total_suppliers = supplier::Entity::find()
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let total_categories = category::Entity::find()
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        let week_ago = Utc::now() - Duration::days(7);
        let recent_transactions = stock_transaction::Entity::find()
            .filter(stock_transaction::Column::CreatedAt.gte(week_ago))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DashboardStats {
            total_products,
            low_stock_products,
            total_suppliers,
            total_categories,
            recent_transactions,
            inventory_value,
            total_quantity,
        })
    }
}

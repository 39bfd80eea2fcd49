use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Product entity
///
/// `quantity` is the denormalized running stock level; outside of direct
/// administrative edits it is only ever written by the transaction ledger,
/// together with exactly one stock_transactions row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Product description
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// SKU (Stock Keeping Unit); unique, treated as an external reference key
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "SKU must be between 1 and 100 characters"
    ))]
    pub sku: String,

    /// Barcode or UPC
    pub barcode: Option<String>,

    /// Selling price per unit
    pub price: Decimal,

    /// Cost per unit (used for inventory valuation)
    pub cost: Decimal,

    /// Current stock level; never negative
    pub quantity: i32,

    /// Advisory low-stock threshold
    pub min_stock: i32,

    /// Advisory high-stock threshold
    pub max_stock: Option<i32>,

    /// Storage location (aisle, bin, warehouse)
    pub location: Option<String>,

    /// Soft-delete flag; inactive products are hidden and reject movements
    pub is_active: bool,

    /// Product category ID
    pub category_id: Option<Uuid>,

    /// Supplier ID
    pub supplier_id: Option<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::stock_transaction::Entity")]
    StockTransactions,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::stock_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransactions.def()
    }
}

impl Model {
    /// Low stock means at or below the advisory minimum.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.is_active {
                active_model.is_active = Set(true);
            }
            active_model.created_at = Set(Utc::now());
        }

        active_model.updated_at = Set(Utc::now());

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            description: None,
            sku: "WID-001".into(),
            barcode: None,
            price: dec!(9.99),
            cost: dec!(4.50),
            quantity: 3,
            min_stock: 5,
            max_stock: None,
            location: None,
            is_active: true,
            category_id: None,
            supplier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_is_inclusive_of_threshold() {
        let mut p = sample();
        assert!(p.is_low_stock());
        p.quantity = 5;
        assert!(p.is_low_stock());
        p.quantity = 6;
        assert!(!p.is_low_stock());
    }

    #[test]
    fn empty_sku_fails_validation() {
        let mut p = sample();
        p.sku = String::new();
        assert!(p.validate().is_err());
    }
}

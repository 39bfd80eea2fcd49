use crate::{
    db::DbPool,
    entities::{category, product, stock_transaction, supplier},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub quantity: i32,
    pub min_stock: i32,
    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Partial update; only provided fields change.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub quantity: Option<i32>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Product row with its category/supplier embedded.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithRefs {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<category::Model>,
    pub supplier: Option<supplier::Model>,
}

/// Product with references and its most recent ledger activity.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<category::Model>,
    pub supplier: Option<supplier::Model>,
    pub transactions: Vec<stock_transaction::Model>,
}

/// Filters for the product list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub low_stock: bool,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Create a product after a SKU uniqueness check.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: NewProduct) -> Result<ProductWithRefs, ServiceError> {
        let db = self.db.as_ref();

        if input.price < Decimal::ZERO || input.cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price and cost must be non-negative".to_string(),
            ));
        }
        if input.quantity < 0 || input.min_stock < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity and minimum stock must be non-negative".to_string(),
            ));
        }

        let existing = product::Entity::find()
            .filter(product::Column::Sku.eq(input.sku.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError("SKU already exists".to_string()));
        }

        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            sku: Set(input.sku),
            barcode: Set(input.barcode),
            price: Set(input.price),
            cost: Set(input.cost),
            quantity: Set(input.quantity),
            min_stock: Set(input.min_stock),
            max_stock: Set(input.max_stock),
            location: Set(input.location),
            category_id: Set(input.category_id),
            supplier_id: Set(input.supplier_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(product_id = %created.id, "Product created");
        if let Err(e) = self.event_sender.send(Event::ProductCreated(created.id)).await {
            warn!("Failed to emit product event: {}", e);
        }

        self.with_refs(created).await
    }

    /// Fetch a product with references and its 10 most recent movements.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let db = self.db.as_ref();

        let item = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let transactions = stock_transaction::Entity::find()
            .filter(stock_transaction::Column::ProductId.eq(id))
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let refs = self.with_refs(item).await?;
        Ok(ProductDetail {
            product: refs.product,
            category: refs.category,
            supplier: refs.supplier,
            transactions,
        })
    }

    /// Apply a partial update; SKU changes re-run the uniqueness check.
    #[instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<ProductWithRefs, ServiceError> {
        let db = self.db.as_ref();

        let existing = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(sku) = &changes.sku {
            if sku != &existing.sku {
                let sku_exists = product::Entity::find()
                    .filter(product::Column::Sku.eq(sku.as_str()))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                if sku_exists.is_some() {
                    return Err(ServiceError::ValidationError("SKU already exists".to_string()));
                }
            }
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(description) = changes.description {
            model.description = Set(Some(description));
        }
        if let Some(sku) = changes.sku {
            model.sku = Set(sku);
        }
        if let Some(barcode) = changes.barcode {
            model.barcode = Set(Some(barcode));
        }
        if let Some(price) = changes.price {
            model.price = Set(price);
        }
        if let Some(cost) = changes.cost {
            model.cost = Set(cost);
        }
        if let Some(quantity) = changes.quantity {
            // Direct administrative edit; writes no ledger row.
            model.quantity = Set(quantity);
        }
        if let Some(min_stock) = changes.min_stock {
            model.min_stock = Set(min_stock);
        }
        if let Some(max_stock) = changes.max_stock {
            model.max_stock = Set(Some(max_stock));
        }
        if let Some(location) = changes.location {
            model.location = Set(Some(location));
        }
        if let Some(category_id) = changes.category_id {
            model.category_id = Set(Some(category_id));
        }
        if let Some(supplier_id) = changes.supplier_id {
            model.supplier_id = Set(Some(supplier_id));
        }
        if let Some(is_active) = changes.is_active {
            model.is_active = Set(is_active);
        }

        let updated = model.update(db).await.map_err(ServiceError::db_error)?;

        info!(product_id = %updated.id, "Product updated");
        if let Err(e) = self.event_sender.send(Event::ProductUpdated(updated.id)).await {
            warn!("Failed to emit product event: {}", e);
        }

        self.with_refs(updated).await
    }

    /// Soft delete: flips `is_active` off, the row stays for the ledger.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let existing = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut model: product::ActiveModel = existing.into();
        model.is_active = Set(false);
        model.update(db).await.map_err(ServiceError::db_error)?;

        info!(product_id = %id, "Product deactivated");
        if let Err(e) = self.event_sender.send(Event::ProductDeactivated(id)).await {
            warn!("Failed to emit product event: {}", e);
        }

        Ok(())
    }

    /// List active products, newest first.
    ///
    /// Low-stock filtering happens in application code over the full match
    /// set, mirroring the query shape this replaces; fine at catalog scale,
    /// revisit if product counts grow large.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductWithRefs>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut select = product::Entity::find().filter(product::Column::IsActive.eq(true));

        if let Some(search) = &filter.search {
            if !search.is_empty() {
                select = select.filter(
                    Condition::any()
                        .add(product::Column::Name.contains(search.as_str()))
                        .add(product::Column::Sku.contains(search.as_str()))
                        .add(product::Column::Description.contains(search.as_str())),
                );
            }
        }
        if let Some(category_id) = filter.category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }

        let mut items = select
            .order_by_desc(product::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if filter.low_stock {
            items.retain(|p| p.is_low_stock());
        }

        let total = items.len() as u64;
        let limit = limit.max(1);
        let skip = (page.max(1) - 1) * limit;
        let page_items: Vec<product::Model> = items
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();

        let category_ids: Vec<Uuid> = page_items.iter().filter_map(|p| p.category_id).collect();
        let supplier_ids: Vec<Uuid> = page_items.iter().filter_map(|p| p.supplier_id).collect();

        let categories: HashMap<Uuid, category::Model> = category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let suppliers: HashMap<Uuid, supplier::Model> = supplier::Entity::find()
            .filter(supplier::Column::Id.is_in(supplier_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let rows = page_items
            .into_iter()
            .map(|p| {
                let category = p.category_id.and_then(|id| categories.get(&id).cloned());
                let supplier = p.supplier_id.and_then(|id| suppliers.get(&id).cloned());
                ProductWithRefs {
                    product: p,
                    category,
                    supplier,
                }
            })
            .collect();

        Ok((rows, total))
    }

    async fn with_refs(&self, item: product::Model) -> Result<ProductWithRefs, ServiceError> {
        let db = self.db.as_ref();

        let category = match item.category_id {
            Some(id) => category::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };
        let supplier = match item.supplier_id {
            Some(id) => supplier::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };

        Ok(ProductWithRefs {
            product: item,
            category,
            supplier,
        })
    }
}

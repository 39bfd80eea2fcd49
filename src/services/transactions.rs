//! The stock-movement ledger.
//!
//! Every quantity change flows through [`TransactionService::record_movement`]:
//! one append-only `stock_transactions` row plus one guarded update of the
//! product's running quantity, committed together or not at all.

use crate::{
    db::DbPool,
    entities::{
        product,
        stock_transaction::{self, MovementType},
        user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Attempts per movement before giving up on a contended product row.
const QUANTITY_WRITE_ATTEMPTS: u32 = 3;

/// A validated request to move stock.
///
/// For IN and OUT, `quantity` is a delta; for ADJUSTMENT it is the new
/// absolute stock level. The shared >=1 constraint means an adjustment can
/// never set a product to exactly zero (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub r#type: MovementType,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub user_id: Uuid,
}

/// Minimal product projection attached to ledger rows for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSummary {
    pub name: String,
    pub sku: String,
}

/// Minimal user projection attached to ledger rows for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

/// A persisted ledger row joined with its display projections.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementRecord {
    pub id: Uuid,
    pub r#type: MovementType,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub product: ProductSummary,
    pub user: UserSummary,
}

/// Filters for the ledger list endpoint.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub r#type: Option<MovementType>,
}

/// Outcome of one committed movement, used to build the response and events.
struct AppliedMovement {
    transaction: stock_transaction::Model,
    product: product::Model,
    account: user::Model,
    old_quantity: i32,
    new_quantity: i32,
}

#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransactionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Apply a stock movement and persist its ledger row atomically.
    ///
    /// The product read, the negativity check, the ledger insert and the
    /// quantity write all happen inside a single database transaction, and
    /// the quantity write only succeeds if the quantity is still the value
    /// that was read. A failed guard aborts and retries the whole unit, so
    /// two movements against the same product can never both apply against
    /// the same stale read.
    #[instrument(skip(self), fields(product_id = %movement.product_id))]
    pub async fn record_movement(
        &self,
        movement: NewMovement,
    ) -> Result<MovementRecord, ServiceError> {
        if movement.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be a positive integer".to_string(),
            ));
        }
        if movement.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price must be non-negative".to_string(),
            ));
        }

        let mut attempt = 0;
        let applied = loop {
            attempt += 1;
            match self.apply_movement(&movement).await {
                Ok(applied) => break applied,
                Err(ServiceError::Conflict(_)) if attempt < QUANTITY_WRITE_ATTEMPTS => {
                    debug!(attempt, "Quantity moved underneath us; retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            transaction_id = %applied.transaction.id,
            movement_type = %applied.transaction.r#type,
            old_quantity = applied.old_quantity,
            new_quantity = applied.new_quantity,
            "Recorded stock movement"
        );

        self.emit_events(&movement, &applied).await;

        Ok(Self::to_record(applied))
    }

    /// One attempt at the atomic unit. `Conflict` means the guarded write
    /// lost a race and the caller may retry.
    async fn apply_movement(&self, movement: &NewMovement) -> Result<AppliedMovement, ServiceError> {
        let movement = movement.clone();
        self.db
            .transaction::<_, AppliedMovement, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = product::Entity::find_by_id(movement.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .filter(|p| p.is_active)
                        .ok_or_else(|| {
                            ServiceError::NotFound("Product not found or inactive".to_string())
                        })?;

                    let account = user::Entity::find_by_id(movement.user_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("User {} not found", movement.user_id))
                        })?;

                    let old_quantity = item.quantity;
                    let new_quantity = match movement.r#type {
                        MovementType::In => old_quantity + movement.quantity,
                        MovementType::Out => {
                            let remaining = old_quantity - movement.quantity;
                            if remaining < 0 {
                                return Err(ServiceError::InsufficientStock(
                                    "Insufficient stock for this transaction".to_string(),
                                ));
                            }
                            remaining
                        }
                        MovementType::Adjustment => movement.quantity,
                    };

                    // Frozen at creation; later price edits never touch it.
                    let total_price = Decimal::from(movement.quantity) * movement.unit_price;

                    let transaction = stock_transaction::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        r#type: Set(movement.r#type.as_str().to_string()),
                        product_id: Set(item.id),
                        quantity: Set(movement.quantity),
                        unit_price: Set(movement.unit_price),
                        total_price: Set(total_price),
                        reference: Set(movement.reference.clone()),
                        description: Set(movement.description.clone()),
                        user_id: Set(account.id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    // Guarded write: only apply if the quantity is still
                    // what we read above.
                    let update = product::Entity::update_many()
                        .col_expr(product::Column::Quantity, Expr::value(new_quantity))
                        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(product::Column::Id.eq(item.id))
                        .filter(product::Column::Quantity.eq(old_quantity))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if update.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Concurrent stock update on product {}",
                            item.id
                        )));
                    }

                    Ok(AppliedMovement {
                        transaction,
                        product: item,
                        account,
                        old_quantity,
                        new_quantity,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }

    /// List ledger rows, newest first, with display projections.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<MovementRecord>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut select = stock_transaction::Entity::find();
        if let Some(product_id) = filter.product_id {
            select = select.filter(stock_transaction::Column::ProductId.eq(product_id));
        }
        if let Some(movement_type) = filter.r#type {
            select = select.filter(stock_transaction::Column::Type.eq(movement_type.as_str()));
        }

        let paginator = select
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .paginate(db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(ServiceError::db_error)?;

        let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
        let user_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();

        let products: HashMap<Uuid, ProductSummary> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProductSummary {
                        name: p.name,
                        sku: p.sku,
                    },
                )
            })
            .collect();

        let users: HashMap<Uuid, UserSummary> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    UserSummary {
                        name: u.name,
                        email: u.email,
                    },
                )
            })
            .collect();

        let records = rows
            .into_iter()
            .map(|row| {
                let product = products.get(&row.product_id).cloned().unwrap_or_else(|| {
                    ProductSummary {
                        name: "unknown".to_string(),
                        sku: "unknown".to_string(),
                    }
                });
                let user = users.get(&row.user_id).cloned().unwrap_or_else(|| UserSummary {
                    name: "unknown".to_string(),
                    email: "unknown".to_string(),
                });
                Self::row_to_record(row, product, user)
            })
            .collect();

        Ok((records, total))
    }

    async fn emit_events(&self, movement: &NewMovement, applied: &AppliedMovement) {
        let event = match movement.r#type {
            MovementType::In => Event::StockReceived {
                transaction_id: applied.transaction.id,
                product_id: applied.product.id,
                quantity: movement.quantity,
                new_quantity: applied.new_quantity,
            },
            MovementType::Out => Event::StockIssued {
                transaction_id: applied.transaction.id,
                product_id: applied.product.id,
                quantity: movement.quantity,
                new_quantity: applied.new_quantity,
            },
            MovementType::Adjustment => Event::StockAdjusted {
                transaction_id: applied.transaction.id,
                product_id: applied.product.id,
                old_quantity: applied.old_quantity,
                new_quantity: applied.new_quantity,
            },
        };

        // The commit already happened; a full event channel must not fail
        // the request.
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Failed to emit movement event: {}", e);
        }

        if matches!(movement.r#type, MovementType::Adjustment) {
            let delta = Decimal::from(applied.new_quantity - applied.old_quantity);
            let revalue = Event::InventoryRevalued {
                product_id: applied.product.id,
                delta_value: delta * applied.product.cost,
            };
            if let Err(e) = self.event_sender.send(revalue).await {
                warn!("Failed to emit revaluation event: {}", e);
            }
        }

        if applied.new_quantity <= applied.product.min_stock {
            let low = Event::LowStock {
                product_id: applied.product.id,
                quantity: applied.new_quantity,
                min_stock: applied.product.min_stock,
            };
            if let Err(e) = self.event_sender.send(low).await {
                warn!("Failed to emit low-stock event: {}", e);
            }
        }
    }

    fn to_record(applied: AppliedMovement) -> MovementRecord {
        let product = ProductSummary {
            name: applied.product.name.clone(),
            sku: applied.product.sku.clone(),
        };
        let user = UserSummary {
            name: applied.account.name.clone(),
            email: applied.account.email.clone(),
        };
        Self::row_to_record(applied.transaction, product, user)
    }

    fn row_to_record(
        row: stock_transaction::Model,
        product: ProductSummary,
        user: UserSummary,
    ) -> MovementRecord {
        MovementRecord {
            id: row.id,
            // Stored strings only ever come from MovementType::as_str
            r#type: MovementType::from_str(&row.r#type).unwrap_or(MovementType::Adjustment),
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            reference: row.reference,
            description: row.description,
            user_id: row.user_id,
            created_at: row.created_at,
            product,
            user,
        }
    }
}

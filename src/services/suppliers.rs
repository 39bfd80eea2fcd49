use crate::{
    db::DbPool,
    entities::{product, supplier},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Supplier with the number of products sourced from it.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierWithCount {
    #[serde(flatten)]
    pub supplier: supplier::Model,
    pub product_count: i64,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_supplier(
        &self,
        input: NewSupplier,
    ) -> Result<SupplierWithCount, ServiceError> {
        let db = self.db.as_ref();

        let created = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(supplier_id = %created.id, "Supplier created");
        if let Err(e) = self
            .event_sender
            .send(Event::SupplierCreated {
                supplier_id: created.id,
            })
            .await
        {
            warn!("Failed to emit supplier event: {}", e);
        }

        Ok(SupplierWithCount {
            supplier: created,
            product_count: 0,
        })
    }

    /// All suppliers, name ascending, with product counts.
    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<SupplierWithCount>, ServiceError> {
        let db = self.db.as_ref();

        let suppliers = supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let counts: HashMap<Uuid, i64> = product::Entity::find()
            .select_only()
            .column(product::Column::SupplierId)
            .column_as(product::Column::Id.count(), "count")
            .group_by(product::Column::SupplierId)
            .into_tuple::<(Option<Uuid>, i64)>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .filter_map(|(id, count)| id.map(|id| (id, count)))
            .collect();

        Ok(suppliers
            .into_iter()
            .map(|s| {
                let product_count = counts.get(&s.id).copied().unwrap_or(0);
                SupplierWithCount {
                    supplier: s,
                    product_count,
                }
            })
            .collect())
    }
}

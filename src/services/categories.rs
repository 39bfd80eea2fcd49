use crate::{
    db::DbPool,
    entities::{category, product},
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
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Category with the number of products referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: category::Model,
    pub product_count: i64,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Create a category after a name uniqueness check.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: NewCategory,
    ) -> Result<CategoryWithCount, ServiceError> {
        let db = self.db.as_ref();

        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(input.name.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Category name already exists".to_string(),
            ));
        }

        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(category_id = %created.id, "Category created");
        if let Err(e) = self
            .event_sender
            .send(Event::CategoryCreated(created.id))
            .await
        {
            warn!("Failed to emit category event: {}", e);
        }

        Ok(CategoryWithCount {
            category: created,
            product_count: 0,
        })
    }

    /// All categories, name ascending, with product counts.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, ServiceError> {
        let db = self.db.as_ref();

        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let counts: HashMap<Uuid, i64> = product::Entity::find()
            .select_only()
            .column(product::Column::CategoryId)
            .column_as(product::Column::Id.count(), "count")
            .group_by(product::Column::CategoryId)
            .into_tuple::<(Option<Uuid>, i64)>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .filter_map(|(id, count)| id.map(|id| (id, count)))
            .collect();

        Ok(categories
            .into_iter()
            .map(|c| {
                let product_count = counts.get(&c.id).copied().unwrap_or(0);
                CategoryWithCount {
                    category: c,
                    product_count,
                }
            })
            .collect())
    }
}

//! Seeds demo users, categories, suppliers and products.
//!
//! Idempotent: rows are looked up by their natural key and only inserted
//! when missing, so re-running against a populated database is safe.

use anyhow::{Context, Result};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use stockroom_api as api;

use api::entities::{category, product, supplier, user};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    api::db::run_migrations(&db).await?;

    seed_user(&db, "admin@example.com", "Admin User", "admin123", "ADMIN").await?;
    seed_user(&db, "manager@example.com", "Manager User", "user123", "MANAGER").await?;
    seed_user(&db, "user@example.com", "Regular User", "user123", "USER").await?;

    let electronics = seed_category(
        &db,
        "Electronics",
        Some("Electronic devices and components"),
    )
    .await?;
    let office = seed_category(&db, "Office Supplies", Some("Office equipment and supplies"))
        .await?;

    let tech_solutions = seed_supplier(
        &db,
        "Tech Solutions Inc.",
        Some("contact@techsolutions.com"),
        Some("+1-555-0123"),
        Some("123 Tech Street, Silicon Valley, CA"),
    )
    .await?;
    let office_pro = seed_supplier(
        &db,
        "Office Pro Ltd.",
        Some("sales@officepro.com"),
        Some("+1-555-0456"),
        Some("456 Business Ave, New York, NY"),
    )
    .await?;

    seed_product(
        &db,
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Business Laptop".to_string()),
            description: Set(Some("High-performance laptop for business use".to_string())),
            sku: Set("LAPTOP-001".to_string()),
            barcode: Set(Some("1234567890123".to_string())),
            price: Set(dec!(1299.99)),
            cost: Set(dec!(899.99)),
            quantity: Set(15),
            min_stock: Set(5),
            max_stock: Set(Some(50)),
            location: Set(Some("A1-01".to_string())),
            category_id: Set(Some(electronics)),
            supplier_id: Set(Some(tech_solutions)),
            ..Default::default()
        },
    )
    .await?;
    seed_product(
        &db,
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Wireless Mouse".to_string()),
            description: Set(Some("Ergonomic wireless mouse".to_string())),
            sku: Set("MOUSE-001".to_string()),
            barcode: Set(Some("1234567890124".to_string())),
            price: Set(dec!(29.99)),
            cost: Set(dec!(19.99)),
            quantity: Set(50),
            min_stock: Set(10),
            max_stock: Set(Some(100)),
            location: Set(Some("A1-02".to_string())),
            category_id: Set(Some(electronics)),
            supplier_id: Set(Some(tech_solutions)),
            ..Default::default()
        },
    )
    .await?;
    seed_product(
        &db,
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Office Desk".to_string()),
            description: Set(Some("Adjustable height office desk".to_string())),
            sku: Set("DESK-001".to_string()),
            barcode: Set(Some("1234567890125".to_string())),
            price: Set(dec!(299.99)),
            cost: Set(dec!(199.99)),
            quantity: Set(8),
            min_stock: Set(2),
            max_stock: Set(Some(20)),
            location: Set(Some("B1-01".to_string())),
            category_id: Set(Some(office)),
            supplier_id: Set(Some(office_pro)),
            ..Default::default()
        },
    )
    .await?;

    info!("Database seeded successfully");
    info!("Users created:");
    info!("- Admin: admin@example.com (password: admin123)");
    info!("- Manager: manager@example.com (password: user123)");
    info!("- User: user@example.com (password: user123)");

    api::db::close_pool(db).await?;
    Ok(())
}

async fn seed_user(
    db: &api::db::DbPool,
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<Uuid> {
    if let Some(existing) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let password_hash =
        api::auth::hash_password(password).map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(email, role, "Seeded user");
    Ok(created.id)
}

async fn seed_category(
    db: &api::db::DbPool,
    name: &str,
    description: Option<&str>,
) -> Result<Uuid> {
    if let Some(existing) = category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let created = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(name, "Seeded category");
    Ok(created.id)
}

async fn seed_supplier(
    db: &api::db::DbPool,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
) -> Result<Uuid> {
    if let Some(existing) = supplier::Entity::find()
        .filter(supplier::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let created = supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.map(str::to_string)),
        phone: Set(phone.map(str::to_string)),
        address: Set(address.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(name, "Seeded supplier");
    Ok(created.id)
}

async fn seed_product(db: &api::db::DbPool, model: product::ActiveModel) -> Result<()> {
    let sku = match &model.sku {
        sea_orm::ActiveValue::Set(sku) => sku.clone(),
        _ => anyhow::bail!("seed product requires a SKU"),
    };

    if product::Entity::find()
        .filter(product::Column::Sku.eq(sku.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    model.insert(db).await?;
    info!(%sku, "Seeded product");
    Ok(())
}

mod common;

use assert_matches::assert_matches;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use stockroom_api::entities::{product, stock_transaction, stock_transaction::MovementType};
use stockroom_api::errors::ServiceError;
use stockroom_api::services::transactions::{MovementFilter, NewMovement};

fn movement(
    r#type: MovementType,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    user_id: Uuid,
) -> NewMovement {
    NewMovement {
        r#type,
        product_id,
        quantity,
        unit_price,
        reference: None,
        description: None,
        user_id,
    }
}

async fn ledger_rows(ctx: &common::TestContext, product_id: Uuid) -> u64 {
    stock_transaction::Entity::find()
        .filter(stock_transaction::Column::ProductId.eq(product_id))
        .count(ctx.db.as_ref())
        .await
        .unwrap()
}

async fn current_quantity(ctx: &common::TestContext, product_id: Uuid) -> i32 {
    product::Entity::find_by_id(product_id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .quantity
}

#[tokio::test]
async fn out_that_drains_stock_exactly_succeeds() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger1@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "DRAIN-001", 10, 5).await;

    let record = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::Out,
            item.id,
            10,
            dec!(2.00),
            account.id,
        ))
        .await
        .unwrap();

    assert_eq!(record.r#type, MovementType::Out);
    assert_eq!(record.quantity, 10);
    assert_eq!(record.total_price, dec!(20.00));
    assert_eq!(record.product.sku, "DRAIN-001");
    assert_eq!(record.user.email, "ledger1@example.com");
    assert_eq!(current_quantity(&ctx, item.id).await, 0);
}

#[tokio::test]
async fn out_exceeding_stock_is_rejected_without_side_effects() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger2@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "OVER-001", 10, 5).await;

    let err = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::Out,
            item.id,
            11,
            dec!(2.00),
            account.id,
        ))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(msg) => {
        assert_eq!(msg, "Insufficient stock for this transaction");
    });
    assert_eq!(current_quantity(&ctx, item.id).await, 10);
    assert_eq!(ledger_rows(&ctx, item.id).await, 0);
}

#[tokio::test]
async fn in_movement_adds_quantity_and_freezes_total_price() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger3@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "IN-001", 10, 5).await;

    let record = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::In,
            item.id,
            7,
            dec!(3.25),
            account.id,
        ))
        .await
        .unwrap();

    assert_eq!(current_quantity(&ctx, item.id).await, 17);
    assert_eq!(record.total_price, dec!(22.75));
    assert_eq!(ledger_rows(&ctx, item.id).await, 1);

    // Later price edits never touch the recorded totals.
    let mut edit: product::ActiveModel = product::Entity::find_by_id(item.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .into();
    edit.price = Set(dec!(999.99));
    edit.update(ctx.db.as_ref()).await.unwrap();

    let stored = stock_transaction::Entity::find_by_id(record.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_price, dec!(22.75));
    assert_eq!(stored.unit_price, dec!(3.25));
}

#[rstest]
#[case(5, 100, 100)]
#[case(100, 1, 1)]
#[case(50, 50, 50)]
#[tokio::test]
async fn adjustment_sets_absolute_quantity(
    #[case] starting: i32,
    #[case] adjustment: i32,
    #[case] expected: i32,
) {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger4@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "ADJ-001", starting, 5).await;

    ctx.services
        .transactions
        .record_movement(movement(
            MovementType::Adjustment,
            item.id,
            adjustment,
            dec!(0),
            account.id,
        ))
        .await
        .unwrap();

    assert_eq!(current_quantity(&ctx, item.id).await, expected);
}

#[rstest]
#[case(0)]
#[case(-3)]
#[tokio::test]
async fn non_positive_quantity_is_rejected(#[case] quantity: i32) {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger5@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "VAL-001", 10, 5).await;

    let err = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::In,
            item.id,
            quantity,
            dec!(1.00),
            account.id,
        ))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(ledger_rows(&ctx, item.id).await, 0);
}

#[tokio::test]
async fn negative_unit_price_is_rejected() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger6@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "VAL-002", 10, 5).await;

    let err = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::In,
            item.id,
            1,
            dec!(-0.01),
            account.id,
        ))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn missing_or_inactive_product_is_rejected() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger7@example.com", "pw-ledger-123").await;

    let err = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::In,
            Uuid::new_v4(),
            1,
            dec!(1.00),
            account.id,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // Soft-deleted products reject movements the same way.
    let item = common::seed_product(&ctx, "INACTIVE-001", 10, 5).await;
    ctx.services.products.deactivate_product(item.id).await.unwrap();

    let err = ctx
        .services
        .transactions
        .record_movement(movement(
            MovementType::In,
            item.id,
            1,
            dec!(1.00),
            account.id,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(ledger_rows(&ctx, item.id).await, 0);
}

#[tokio::test]
async fn concurrent_outs_jointly_exceeding_stock_yield_one_success() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger8@example.com", "pw-ledger-123").await;
    let item = common::seed_product(&ctx, "RACE-001", 10, 0).await;

    // Each OUT is individually valid against the starting quantity of 10,
    // but together they exceed it.
    let service_a = ctx.services.transactions.clone();
    let service_b = ctx.services.transactions.clone();
    let movement_a = movement(MovementType::Out, item.id, 7, dec!(1.00), account.id);
    let movement_b = movement(MovementType::Out, item.id, 7, dec!(1.00), account.id);

    let (result_a, result_b) = tokio::join!(
        tokio::spawn(async move { service_a.record_movement(movement_a).await }),
        tokio::spawn(async move { service_b.record_movement(movement_b).await }),
    );
    let results = [result_a.unwrap(), result_b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two OUTs may succeed");
    let failure = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one failure");
    assert_matches!(failure, ServiceError::InsufficientStock(_));

    assert_eq!(current_quantity(&ctx, item.id).await, 3);
    assert_eq!(ledger_rows(&ctx, item.id).await, 1);
}

// Requires a real multi-connection database; run with:
// DATABASE_URL=postgres://... cargo test -- --ignored ledger_contention
#[tokio::test]
#[ignore]
async fn ledger_contention_under_many_writers() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let pool = stockroom_api::db::establish_connection(&url).await.expect("db connect");
    stockroom_api::db::run_migrations(&pool).await.expect("migrations");

    let db = std::sync::Arc::new(pool);
    let (tx, rx) = tokio::sync::mpsc::channel(100);
    tokio::spawn(stockroom_api::events::process_events(rx));
    let services = stockroom_api::handlers::AppServices::new(
        db.clone(),
        stockroom_api::events::EventSender::new(tx),
    );

    let suffix = Uuid::new_v4().simple().to_string();
    let account = stockroom_api::entities::user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(format!("contention-{}@example.com", suffix)),
        name: Set("Contention".to_string()),
        password_hash: Set("x".to_string()),
        role: Set("USER".to_string()),
        ..Default::default()
    }
    .insert(db.as_ref())
    .await
    .expect("seed user");
    let item = stockroom_api::entities::product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Contended".to_string()),
        description: Set(None),
        sku: Set(format!("RACE-{}", suffix)),
        barcode: Set(None),
        price: Set(dec!(1.00)),
        cost: Set(dec!(1.00)),
        quantity: Set(10),
        min_stock: Set(0),
        max_stock: Set(None),
        location: Set(None),
        category_id: Set(None),
        supplier_id: Set(None),
        ..Default::default()
    }
    .insert(db.as_ref())
    .await
    .expect("seed product");

    // 20 concurrent single-unit issues against 10 on hand: exactly 10 land.
    let mut tasks = vec![];
    for _ in 0..20 {
        let svc = services.transactions.clone();
        let m = movement(MovementType::Out, item.id, 1, dec!(1.00), account.id);
        tasks.push(tokio::spawn(async move { svc.record_movement(m).await.is_ok() }));
    }
    let mut successes = 0;
    for t in tasks {
        if t.await.unwrap_or(false) {
            successes += 1;
        }
    }
    assert_eq!(successes, 10, "exactly 10 issues should succeed");

    let remaining = stockroom_api::entities::product::Entity::find_by_id(item.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .quantity;
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn list_movements_filters_and_paginates_newest_first() {
    let ctx = common::setup().await;
    let account = common::seed_user(&ctx, "ledger9@example.com", "pw-ledger-123").await;
    let item_a = common::seed_product(&ctx, "LIST-A", 100, 0).await;
    let item_b = common::seed_product(&ctx, "LIST-B", 100, 0).await;

    for i in 1..=3 {
        ctx.services
            .transactions
            .record_movement(movement(
                MovementType::In,
                item_a.id,
                i,
                dec!(1.00),
                account.id,
            ))
            .await
            .unwrap();
    }
    ctx.services
        .transactions
        .record_movement(movement(
            MovementType::Out,
            item_b.id,
            5,
            dec!(1.00),
            account.id,
        ))
        .await
        .unwrap();

    let (all, total) = ctx
        .services
        .transactions
        .list_movements(MovementFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(all.len(), 4);
    for pair in all.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at, "newest first");
    }

    let (only_a, total_a) = ctx
        .services
        .transactions
        .list_movements(
            MovementFilter {
                product_id: Some(item_a.id),
                r#type: None,
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total_a, 3);
    assert!(only_a.iter().all(|r| r.product_id == item_a.id));
    assert!(only_a.iter().all(|r| r.product.sku == "LIST-A"));

    let (only_out, total_out) = ctx
        .services
        .transactions
        .list_movements(
            MovementFilter {
                product_id: None,
                r#type: Some(MovementType::Out),
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total_out, 1);
    assert_eq!(only_out[0].r#type, MovementType::Out);

    let (page2, _) = ctx
        .services
        .transactions
        .list_movements(MovementFilter::default(), 2, 3)
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);
}

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = r#"
Inventory and stock-movement tracking API.

Products, categories and suppliers are plain CRUD; every stock change goes
through the transaction ledger: an append-only movement record plus an
atomic update of the product's running quantity.

All `/api/v1` endpoints require a JWT obtained from `/auth/login`:

```
Authorization: Bearer <access-token>
```
"#
    ),
    paths(
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::list_transactions,
        crate::handlers::dashboard::get_stats,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::stock_transaction::MovementType,
        crate::handlers::transactions::CreateTransactionRequest,
        crate::handlers::transactions::TransactionListResponse,
        crate::handlers::common::PaginationMeta,
        crate::services::transactions::MovementRecord,
        crate::services::transactions::ProductSummary,
        crate::services::transactions::UserSummary,
        crate::services::dashboard::DashboardStats,
    )),
    tags(
        (name = "transactions", description = "Stock-movement ledger"),
        (name = "dashboard", description = "Aggregate statistics")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

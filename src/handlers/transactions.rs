use super::common::{
    created_response, default_limit, default_page, map_service_error, success_response,
    validate_input, PaginationMeta,
};
use crate::{
    auth::AuthenticatedUser,
    entities::stock_transaction::MovementType,
    errors::ApiError,
    handlers::AppState,
    services::transactions::{MovementFilter, MovementRecord, NewMovement},
};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransactionRequest {
    /// IN and OUT move stock by `quantity`; ADJUSTMENT sets the absolute
    /// level. Because `quantity` must be ≥ 1, an adjustment cannot set a
    /// product to exactly zero.
    pub r#type: MovementType,

    pub product_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: i32,

    /// Non-negative; checked against Decimal semantics in the service
    pub unit_price: Decimal,

    #[validate(length(max = 255, message = "Reference cannot exceed 255 characters"))]
    pub reference: Option<String>,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Restrict to one product
    pub product_id: Option<Uuid>,
    /// Restrict to one movement type (IN, OUT, ADJUSTMENT)
    pub r#type: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<MovementRecord>,
    pub pagination: PaginationMeta,
}

// Handler functions

/// Record a stock movement
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Movement recorded", body = MovementRecord),
        (status = 400, description = "Validation failure or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product missing or inactive", body = crate::errors::ErrorResponse),
        (status = 409, description = "Contended product row", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let movement = NewMovement {
        r#type: payload.r#type,
        product_id: payload.product_id,
        quantity: payload.quantity,
        unit_price: payload.unit_price,
        reference: payload.reference,
        description: payload.description,
        user_id: user.user_id,
    };

    let record = state
        .services
        .transactions
        .record_movement(movement)
        .await
        .map_err(map_service_error)?;

    info!("Transaction recorded: {}", record.id);

    Ok(created_response(record))
}

/// List stock movements, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transaction page returned", body = TransactionListResponse),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let movement_type = match query.r#type.as_deref() {
        Some(raw) => Some(MovementType::from_str(raw).ok_or_else(|| {
            ApiError::ValidationError {
                errors: vec!["type: must be one of IN, OUT, ADJUSTMENT".to_string()],
            }
        })?),
        None => None,
    };

    let filter = MovementFilter {
        product_id: query.product_id,
        r#type: movement_type,
    };

    let (transactions, total) = state
        .services
        .transactions
        .list_movements(filter, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(TransactionListResponse {
        transactions,
        pagination: PaginationMeta::new(query.page, query.limit, total),
    }))
}

/// Creates the router for transaction endpoints
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/", get(list_transactions))
}

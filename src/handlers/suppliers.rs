use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, errors::ApiError, handlers::AppState, services::suppliers::NewSupplier,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Email must be valid"))]
    pub email: Option<String>,

    #[validate(length(max = 64, message = "Phone cannot exceed 64 characters"))]
    pub phone: Option<String>,

    pub address: Option<String>,
}

/// Create a new supplier
async fn create_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .suppliers
        .create_supplier(NewSupplier {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
        })
        .await
        .map_err(map_service_error)?;

    info!("Supplier created: {}", created.supplier.id);

    Ok(created_response(created))
}

/// List all suppliers with product counts
async fn list_suppliers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let suppliers = state
        .services
        .suppliers
        .list_suppliers()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(suppliers))
}

/// Creates the router for supplier endpoints
pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supplier))
        .route("/", get(list_suppliers))
}

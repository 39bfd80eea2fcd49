use super::common::{
    created_response, default_limit, default_page, map_service_error, success_response,
    validate_input, PaginationMeta,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    handlers::AppState,
    services::products::{NewProduct, ProductChanges, ProductFilter, ProductWithRefs},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100, message = "SKU is required"))]
    pub sku: String,

    pub barcode: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,

    #[validate(range(min = 0, message = "Quantity must be non-negative"))]
    #[serde(default)]
    pub quantity: i32,

    #[validate(range(min = 0, message = "Minimum stock must be non-negative"))]
    #[serde(default)]
    pub min_stock: i32,

    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "SKU is required"))]
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity must be non-negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, message = "Minimum stock must be non-negative"))]
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    /// Category id filter
    pub category: Option<Uuid>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductWithRefs>,
    pub pagination: PaginationMeta,
}

// Handler functions

/// Create a new product
async fn create_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = NewProduct {
        name: payload.name,
        description: payload.description,
        sku: payload.sku,
        barcode: payload.barcode,
        price: payload.price,
        cost: payload.cost,
        quantity: payload.quantity,
        min_stock: payload.min_stock,
        max_stock: payload.max_stock,
        location: payload.location,
        category_id: payload.category_id,
        supplier_id: payload.supplier_id,
    };

    let created = state
        .services
        .products
        .create_product(input)
        .await
        .map_err(map_service_error)?;

    info!("Product created: {}", created.product.id);

    Ok(created_response(created))
}

/// Get a product with its references and recent movements
async fn get_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .products
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(detail))
}

/// Update a product
async fn update_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let changes = ProductChanges {
        name: payload.name,
        description: payload.description,
        sku: payload.sku,
        barcode: payload.barcode,
        price: payload.price,
        cost: payload.cost,
        quantity: payload.quantity,
        min_stock: payload.min_stock,
        max_stock: payload.max_stock,
        location: payload.location,
        category_id: payload.category_id,
        supplier_id: payload.supplier_id,
        is_active: payload.is_active,
    };

    let updated = state
        .services
        .products
        .update_product(product_id, changes)
        .await
        .map_err(map_service_error)?;

    info!("Product updated: {}", product_id);

    Ok(success_response(updated))
}

/// Soft-delete a product
async fn delete_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .products
        .deactivate_product(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product deactivated: {}", product_id);

    Ok(success_response(serde_json::json!({
        "message": "Product deleted successfully"
    })))
}

/// List active products with search and low-stock filters
async fn list_products(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category,
        low_stock: query.low_stock,
    };

    let (products, total) = state
        .services
        .products
        .list_products(filter, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductListResponse {
        products,
        pagination: PaginationMeta::new(query.page, query.limit, total),
    }))
}

/// Creates the router for product endpoints
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
}

use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, errors::ApiError, handlers::AppState,
    services::categories::NewCategory,
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
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
}

/// Create a new category
async fn create_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .categories
        .create_category(NewCategory {
            name: payload.name,
            description: payload.description,
        })
        .await
        .map_err(map_service_error)?;

    info!("Category created: {}", created.category.id);

    Ok(created_response(created))
}

/// List all categories with product counts
async fn list_categories(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list_categories()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

/// Creates the router for category endpoints
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/", get(list_categories))
}

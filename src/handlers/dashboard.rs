use super::common::{map_service_error, success_response};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

/// Aggregate dashboard statistics
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = crate::services::dashboard::DashboardStats),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn get_stats(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .dashboard
        .stats()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// Creates the router for dashboard endpoints
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

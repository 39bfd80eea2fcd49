use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Validate request input, collecting per-field errors for the 400 body.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(|e| {
        let mut errors: Vec<String> = e
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |err| {
                    let detail = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    format!("{}: {}", field, detail)
                })
            })
            .collect();
        errors.sort();
        ApiError::ValidationError { errors }
    })
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Default pagination window for list endpoints
pub fn default_page() -> u64 {
    1
}

pub fn default_limit() -> u64 {
    10
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 10, 21);
        assert_eq!(meta.pages, 3);
        assert_eq!(PaginationMeta::new(1, 10, 0).pages, 0);
        assert_eq!(PaginationMeta::new(1, 10, 10).pages, 1);
    }

    #[test]
    fn validate_input_collects_field_errors() {
        #[derive(Validate)]
        struct Payload {
            #[validate(length(min = 1, message = "Name is required"))]
            name: String,
        }

        let err = validate_input(&Payload {
            name: String::new(),
        })
        .unwrap_err();
        match err {
            ApiError::ValidationError { errors } => {
                assert_eq!(errors, vec!["name: Name is required".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

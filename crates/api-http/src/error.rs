use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use resona_core::domain::DomainError;
use resona_core::error::AppError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`AppError`] for core errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent `{"error": ...}` JSON
/// bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core-level error.
    #[error(transparent)]
    Core(#[from] AppError),

    /// A lookup for an unknown id - surfaced as 404, not a system fault.
    #[error("{0}")]
    NotFound(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(core) => match core {
                AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                AppError::Domain(DomainError::TaskNotFound(id)) => {
                    (StatusCode::NOT_FOUND, format!("Task not found: {id}"))
                }
                AppError::Domain(DomainError::TaskStillActive(id)) => (
                    StatusCode::CONFLICT,
                    format!("task {id} is still being processed"),
                ),
                other => {
                    tracing::error!(error = %other, "Internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal error occurred".to_string(),
                    )
                }
            },
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

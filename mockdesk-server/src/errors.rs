//! API error types and conversions

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// API error type for resource handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type for handler operations
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    // Common error constructors

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} with ID '{}' not found", resource, id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "status": status.as_u16()
            }
        });

        // Marshaling the error body must never panic; fall back to a
        // hand-built minimal JSON string.
        let serialized = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(
                "{{\"error\":{{\"code\":\"{}\",\"status\":{}}}}}",
                self.error_code(),
                status.as_u16()
            )
        });

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            serialized,
        )
            .into_response()
    }
}

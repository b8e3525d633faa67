//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tingxie_core::TingxieError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong.
    pub error: String,
    /// Machine-readable error code (e.g., "bad_request").
    pub code: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 500 - the upstream dictionary failed or had no entry.
    Translation(String),
    /// 429 - the dictionary proxy's per-second budget is spent.
    RateLimited,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::Translation(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "translation_failed", msg)
            }
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = ErrorBody {
            error,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<TingxieError> for ApiError {
    fn from(err: TingxieError) -> Self {
        match err {
            TingxieError::Translation(msg) => ApiError::Translation(msg),
            TingxieError::Pagination(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

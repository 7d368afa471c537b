//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping assistant errors to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use shopmate_assistant::AssistantError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    #[error("{0}")]
    BadRequest(String),
    /// 404 Not Found - session does not exist or has expired.
    #[error("{0}")]
    NotFound(String),
    /// 409 Conflict - the session cannot accept this turn in its current state.
    #[error("{0}")]
    Conflict(String),
    /// 502 Bad Gateway - a generation backend failed.
    #[error("{0}")]
    BadGateway(String),
    /// 500 Internal Server Error - unexpected server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        }

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        let message = err.to_string();
        match err {
            AssistantError::EmptyMessage
            | AssistantError::MessageTooLong(_)
            | AssistantError::InvalidModelChoice(_) => ApiError::BadRequest(message),
            AssistantError::SessionNotFound(_) => ApiError::NotFound(message),
            AssistantError::InvalidTransition(..) => ApiError::Conflict(message),
            AssistantError::Generation(_) => ApiError::BadGateway(message),
            AssistantError::Store(_) => ApiError::Internal(message),
        }
    }
}

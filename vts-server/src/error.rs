//! API error types
//!
//! Every error surfaced to the dashboard maps to a distinct code so the UI
//! can tell a number collision from an exact duplicate from a reused
//! receipt. All responses use the `{"error": {"code", "message"}}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classify::ClassifyError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session token, or the token is unknown (401)
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Field-level validation failure (400)
    #[error("{0}")]
    Validation(String),

    /// Another record already uses the requested sequence number (409)
    #[error("{0}")]
    NumberCollision(String),

    /// A record identical in plate, name, offense, section, date, and level
    /// already exists (409)
    #[error("{0}")]
    ExactDuplicate(String),

    /// The official receipt number is already used by another record (409)
    #[error("{0}")]
    ReceiptAlreadyUsed(String),

    /// Row missing, or owned by a different user (404)
    #[error("{0}")]
    NotFoundOrUnauthorized(String),

    /// Import-time fuzzy lookup matched more than one catalog entry (422)
    #[error("{0}")]
    AmbiguousMatch(String),

    /// No fine schedule entry for the (offense, level) pair (422)
    #[error("{0}")]
    FineScheduleMissing(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared error
    #[error("Common error: {0}")]
    Common(#[from] vts_common::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        let message = err.to_string();
        match err {
            ClassifyError::Validation(_) => ApiError::Validation(message),
            ClassifyError::NumberCollision { .. } => ApiError::NumberCollision(message),
            ClassifyError::ExactDuplicate { .. } => ApiError::ExactDuplicate(message),
            ClassifyError::ReceiptAlreadyUsed { .. } => ApiError::ReceiptAlreadyUsed(message),
            ClassifyError::AmbiguousMatch { .. } => ApiError::AmbiguousMatch(message),
            ClassifyError::FineScheduleMissing { .. } => ApiError::FineScheduleMissing(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                self.to_string(),
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::NumberCollision(msg) => (StatusCode::CONFLICT, "NUMBER_COLLISION", msg),
            ApiError::ExactDuplicate(msg) => (StatusCode::CONFLICT, "EXACT_DUPLICATE", msg),
            ApiError::ReceiptAlreadyUsed(msg) => {
                (StatusCode::CONFLICT, "RECEIPT_ALREADY_USED", msg)
            }
            ApiError::NotFoundOrUnauthorized(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::AmbiguousMatch(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "AMBIGUOUS_MATCH", msg)
            }
            ApiError::FineScheduleMissing(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "FINE_SCHEDULE_MISSING",
                msg,
            ),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

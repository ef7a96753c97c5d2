//! Error types for the analysis service
//!
//! Every error response carries a stable machine-readable `code` and a
//! human-readable `message` in the `{"error": {...}}` envelope. Internal
//! detail is logged server-side and never echoed to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or disallowed input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid identity (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Credit balance below the analysis cost (402)
    #[error("Insufficient credits to perform analysis")]
    InsufficientCredits,

    /// Malformed job id in the request path (400)
    #[error("Invalid job ID format")]
    InvalidJobId,

    /// Job absent or owned by a different user (404)
    #[error("Analysis job not found")]
    JobNotFound,

    /// Results requested for an absent or foreign job (404)
    #[error("Analysis results not found or not yet available")]
    ResultsNotFound,

    /// Results requested before the job reached `completed` (409)
    #[error("Analysis is {0}. Results not yet available.")]
    NotComplete(String),

    /// Request admission rate exceeded (429)
    #[error("Too many requests. Please try again later.")]
    RateLimited,

    /// Store write/read failure (500, detail logged only)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error (500, detail logged only)
    #[error("Internal error: {0}")]
    Internal(String),

    /// improver-common error
    #[error(transparent)]
    Common(improver_common::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InsufficientCredits => {
                (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_CREDITS")
            }
            ApiError::InvalidJobId => (StatusCode::BAD_REQUEST, "INVALID_JOB_ID"),
            ApiError::JobNotFound => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND"),
            ApiError::ResultsNotFound => (StatusCode::NOT_FOUND, "RESULTS_NOT_FOUND"),
            ApiError::NotComplete(_) => (StatusCode::CONFLICT, "ANALYSIS_NOT_COMPLETE"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Common(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl From<improver_common::Error> for ApiError {
    fn from(err: improver_common::Error) -> Self {
        match err {
            improver_common::Error::InsufficientCredits(_) => ApiError::InsufficientCredits,
            other => ApiError::Common(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // 5xx detail stays server-side; the client gets a generic message
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with internal error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

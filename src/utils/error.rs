//! Error Handling Utilities
//!
//! Central error taxonomy for the service and its mapping onto HTTP
//! responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type that can represent errors from any feature
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, invalid, revoked, or expired credentials; bad secret; wrong
    /// one-time code
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown identity, email, or challenge target
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Duplicate registration or federated-login intent mismatch
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Per-identity allowance exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// One-time code window elapsed. Kept distinct from a wrong code so
    /// clients can prompt "resend" instead of "retry".
    #[error("Expired: {0}")]
    Expired(String),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// External collaborator (notifier, analyzer, provider) failure
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// Generic internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Standard error response structure for API endpoints
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::RateLimited(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED", msg)
            }
            AppError::Expired(msg) => (StatusCode::GONE, "CODE_EXPIRED", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::ExternalService(_) => (
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_SERVICE_ERROR",
                "External service unavailable".to_string(),
            ),
            // Internal detail (driver messages, stack context) never reaches
            // the caller; it is logged where the error originates.
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
            AppError::Hashing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "HASHING_ERROR",
                "Password hashing error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            ),
            AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "Server configuration error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(error_code, &message);
        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can return AppError
pub type AppResult<T> = Result<T, AppError>;

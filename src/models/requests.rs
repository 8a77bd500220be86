//! Request and Response Models
//!
//! Data transfer structures for the HTTP API, with validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::UserRole;

/// Request to register a new identity
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Unique login name
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,

    /// Unique email address
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    /// Plain-text password, hashed before storage
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    /// Requested access tier; defaults to ordinary when absent
    pub role: Option<UserRole>,
}

/// First login factor: name + secret
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Second login factor: name + one-time code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyLoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,
}

/// Start of the password reset flow
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Intermediate reset step: check the code without consuming it
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyResetCodeRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,
}

/// Final reset step: code + replacement secret
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Registration completion after a federated login for an unknown email
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteRegistrationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    /// Bridging token proving the email passed through the provider
    #[serde(rename = "tempToken")]
    #[validate(length(min = 1, message = "Bridging token is required"))]
    pub temp_token: String,
}

/// Secret-verified account deletion
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Protected operation payload: pre-extracted contract text for analysis
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalyzeContractRequest {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: String,

    #[validate(length(min = 1, message = "Contract text is required"))]
    pub text: String,
}

/// Generic message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Session token response
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub message: String,
}

/// Remaining allowance for the calling identity.
///
/// `unlimited` is the explicit tier signal; clients must not infer it from
/// the size of `remaining`.
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub remaining: u64,
    pub unlimited: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

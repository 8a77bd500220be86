//! HTTP Request Handlers
//!
//! Axum handlers for authentication, account management, the rate-limited
//! protected operation, and service health.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use validator::Validate;

use crate::api::middleware::{extract_bearer, AuthUser};
use crate::models::requests::*;
use crate::models::User;
use crate::service::{
    AuthService, ContractAnalyzer, FederatedAuthService, GoogleOAuthClient, RateLimitService,
    RevocationList, TokenService,
};
use crate::store::UserStore;
use crate::utils::error::{AppError, AppResult};
use crate::VERSION;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub revocation_list: Arc<RevocationList>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub federated_auth_service: Arc<FederatedAuthService>,
    pub google_oauth: Option<Arc<GoogleOAuthClient>>,
    pub analyzer: Option<Arc<dyn ContractAnalyzer>>,
    pub store: Arc<dyn UserStore>,
    pub frontend_base_url: String,
}

/// Standard success response wrapper
#[derive(serde::Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Register a new identity
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<SuccessResponse<User>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid registration data: {}", e)))?;

    let user = state.auth_service.register(request).await?;
    Ok(Json(SuccessResponse::new(user)))
}

/// First login factor: username + password. Success dispatches a one-time
/// code; no token is returned yet.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid login data: {}", e)))?;

    state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "OTP sent to email",
    ))))
}

/// Second login factor: username + one-time code. Success yields the
/// session token.
pub async fn verify_login(
    State(state): State<AppState>,
    Json(request): Json<VerifyLoginRequest>,
) -> AppResult<Json<SuccessResponse<TokenResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid verification data: {}", e)))?;

    let token = state
        .auth_service
        .verify_login(&request.username, &request.otp)
        .await?;

    Ok(Json(SuccessResponse::new(TokenResponse {
        token,
        message: "Login successful".to_string(),
    })))
}

/// Revoke the presented bearer token
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    if let Some(raw) = extract_bearer(&headers) {
        state.auth_service.logout(raw);
    }

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "Logout successful",
    ))))
}

/// Public record of the authenticated identity
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
) -> AppResult<Json<SuccessResponse<User>>> {
    let user = state.auth_service.profile(&context.username).await?;
    Ok(Json(SuccessResponse::new(user)))
}

/// Start the password reset flow
pub async fn forgot_password_send_otp(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid email: {}", e)))?;

    state
        .auth_service
        .initiate_password_reset(&request.email)
        .await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "OTP sent to email",
    ))))
}

/// Check the reset code without consuming it
pub async fn forgot_password_verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyResetCodeRequest>,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid verification data: {}", e)))?;

    state
        .auth_service
        .check_reset_code(&request.email, &request.otp)
        .await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "Code verified",
    ))))
}

/// Complete the password reset
pub async fn forgot_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid reset data: {}", e)))?;

    state
        .auth_service
        .reset_password(&request.email, &request.otp, &request.new_password)
        .await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "Password reset successful",
    ))))
}

/// Destroy the authenticated identity after re-verifying its secret
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
    Json(request): Json<DeleteAccountRequest>,
) -> AppResult<Json<SuccessResponse<MessageResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    state
        .auth_service
        .delete_account(&context.username, &request.password)
        .await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "Account deleted successfully",
    ))))
}

/// Remaining analysis allowance for the authenticated identity
pub async fn usage_remaining(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
) -> AppResult<Json<SuccessResponse<UsageResponse>>> {
    let status = state.rate_limit_service.remaining(&context.username).await?;

    Ok(Json(SuccessResponse::new(UsageResponse {
        remaining: status.remaining,
        unlimited: status.unlimited,
    })))
}

/// The rate-limited protected operation: run a contract analysis.
///
/// The bucket is consumed before the backend is consulted, so an exhausted
/// allowance never costs external work.
pub async fn analyze_contract(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
    Json(request): Json<AnalyzeContractRequest>,
) -> AppResult<Json<SuccessResponse<crate::service::AnalysisReport>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid analysis request: {}", e)))?;

    if !state
        .rate_limit_service
        .try_consume(&context.username)
        .await?
    {
        return Err(AppError::RateLimited(
            "Analysis limit exceeded. Ordinary accounts are limited to 2 analyses per hour."
                .to_string(),
        ));
    }

    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| AppError::ExternalService("Analysis backend not configured".to_string()))?;

    let report = analyzer
        .analyze(&context.username, &request.filename, &request.text)
        .await?;

    Ok(Json(SuccessResponse::new(report)))
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse<HealthCheckResponse>>> {
    state.store.health_check().await?;

    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    };

    Ok(Json(SuccessResponse::new(response)))
}

//! Authentication Middleware
//!
//! Per-request gate over the bearer credential. Order matters: a revoked
//! token is rejected before any signature parsing, a malformed or expired
//! one merely leaves the request unauthenticated so public routes keep
//! working with a garbage header, and the route itself decides whether an
//! authenticated caller is required via the [`AuthUser`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use log::debug;

use crate::api::handlers::AppState;
use crate::models::UserContext;
use crate::service::token::TokenError;
use crate::utils::error::AppError;

/// Authenticated identity stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

/// Extract the raw bearer credential from the authorization header
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Request gate applied to every `/api` route.
///
/// Stages, in order:
/// 1. no bearer credential: proceed unauthenticated;
/// 2. revoked credential: reject immediately, without parsing;
/// 3. validation failure (parse, signature, expiry): proceed
///    unauthenticated;
/// 4. success: bind the identity to the request, at most once.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = extract_bearer(request.headers()).map(str::to_string);

    if let Some(raw) = bearer {
        if state.revocation_list.is_revoked(&raw) {
            return Err(AppError::Unauthorized(
                "Token is invalid (logged out)".to_string(),
            ));
        }

        match state.token_service.validate_session(&raw) {
            Ok(claims) => {
                if request.extensions().get::<AuthUser>().is_none() {
                    request
                        .extensions_mut()
                        .insert(AuthUser(UserContext::from_claims(&claims)));
                }
            }
            Err(TokenError::Expired) => {
                debug!("expired bearer token; proceeding unauthenticated");
            }
            Err(_) => {
                debug!("invalid bearer token; proceeding unauthenticated");
            }
        }
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

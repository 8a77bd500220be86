//! Federated Login Handlers
//!
//! The HTTP face of the federated bridge: provider redirect, callback, and
//! the bridging-token-gated registration completion. The callback encodes
//! its outcome into a client redirect URL exactly like the original flow:
//! a session token, an error code, or a bridging token plus prefill fields.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect},
    Json,
};
use serde::Deserialize;
use url::form_urlencoded;
use validator::Validate;

use crate::api::handlers::{AppState, SuccessResponse};
use crate::models::requests::{CompleteRegistrationRequest, TokenResponse};
use crate::models::{AuthIntent, FederatedOutcome};
use crate::utils::error::{AppError, AppResult};

/// Name of the cookie carrying the client's login-vs-register intent
const AUTH_INTENT_COOKIE: &str = "auth_intent";

/// Name of the cookie pinning the provider CSRF state between init and
/// callback
const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Query parameters delivered by the provider callback
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Read a cookie value out of the request headers
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Begin the provider flow: redirect to Google's authorization endpoint,
/// pinning the CSRF state in a short-lived cookie
pub async fn google_init(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let oauth = state
        .google_oauth
        .as_ref()
        .ok_or_else(|| AppError::Configuration("OAuth provider not configured".to_string()))?;

    let (url, csrf_state) = oauth.authorization_url();
    let cookie = format!(
        "{}={}; Path=/; Max-Age=600; HttpOnly; SameSite=Lax",
        OAUTH_STATE_COOKIE, csrf_state
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::temporary(&url),
    ))
}

/// Provider callback: exchange the code, then bridge the verified identity
/// into a client redirect
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
) -> AppResult<Redirect> {
    let oauth = state
        .google_oauth
        .as_ref()
        .ok_or_else(|| AppError::Configuration("OAuth provider not configured".to_string()))?;

    match cookie_value(&headers, OAUTH_STATE_COOKIE) {
        Some(expected) if expected == query.state => {}
        _ => {
            return Err(AppError::Unauthorized(
                "OAuth state mismatch".to_string(),
            ))
        }
    }

    let identity = oauth.fetch_verified_identity(&query.code).await?;
    let intent =
        AuthIntent::from_cookie_value(cookie_value(&headers, AUTH_INTENT_COOKIE).as_deref());

    let outcome = state
        .federated_auth_service
        .handle_callback(&identity.email, identity.display_name.as_deref(), intent)
        .await?;

    Ok(Redirect::temporary(&redirect_for(
        &state.frontend_base_url,
        &outcome,
    )))
}

/// Map a bridge outcome onto the client redirect URL
fn redirect_for(base: &str, outcome: &FederatedOutcome) -> String {
    match outcome {
        FederatedOutcome::SignedIn { token } => {
            format!("{}/login?{}", base, encode_pairs(&[("token", token)]))
        }
        FederatedOutcome::AlreadyRegistered => format!("{}/login?error=user_exists", base),
        FederatedOutcome::AccountNotFound => {
            format!("{}/register?error=account_not_found", base)
        }
        FederatedOutcome::CompleteRegistration {
            email,
            display_name,
            bridge_token,
        } => format!(
            "{}/complete-registration?{}",
            base,
            encode_pairs(&[
                ("email", email),
                ("name", display_name),
                ("tempToken", bridge_token),
            ])
        ),
    }
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Complete a federated registration: bridging token + chosen credentials
/// in, identity + session token out
pub async fn oauth_complete(
    State(state): State<AppState>,
    Json(request): Json<CompleteRegistrationRequest>,
) -> AppResult<Json<SuccessResponse<TokenResponse>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid registration data: {}", e)))?;

    let (_user, token) = state
        .federated_auth_service
        .complete_registration(request)
        .await?;

    Ok(Json(SuccessResponse::new(TokenResponse {
        token,
        message: "Registration complete".to_string(),
    })))
}

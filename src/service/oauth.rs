//! Federated Login Bridge
//!
//! Reconciles an external identity provider's verified callback (email +
//! display name) against the identity store under the client's declared
//! intent, and hands off through the same token service as password logins.
//! Federated logins bypass the OTP second factor: the provider already
//! verified the channel.
//!
//! [`GoogleOAuthClient`] is the thin provider adapter (authorization URL,
//! code exchange, userinfo fetch); the bridge itself never talks to the
//! network.

use log::info;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::GoogleOAuthConfig;
use crate::models::requests::CompleteRegistrationRequest;
use crate::models::{AuthIntent, FederatedOutcome, NewUser, User, UserRole};
use crate::service::token::{TokenError, TokenService};
use crate::store::{StoreError, UserStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::security::{hash_password_with_cost, DEFAULT_BCRYPT_COST};
use crate::utils::validation::{normalize_email, validate_username};

/// Federated login specific errors
#[derive(Error, Debug)]
pub enum FederatedError {
    /// Bridging token missing, expired, for another email, or not a
    /// bridging token at all
    #[error("Invalid registration token")]
    InvalidBridgeToken,

    /// Input validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Token issuance failed")]
    Token(#[from] TokenError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<FederatedError> for AppError {
    fn from(err: FederatedError) -> Self {
        match err {
            FederatedError::InvalidBridgeToken => {
                AppError::Unauthorized("Invalid or expired registration token".to_string())
            }
            FederatedError::Validation(msg) => AppError::Validation(msg),
            FederatedError::Store(e) => e.into(),
            FederatedError::Token(e) => e.into(),
            FederatedError::Hashing(e) => AppError::Hashing(e),
        }
    }
}

/// Result type for federated login operations
pub type FederatedResult<T> = Result<T, FederatedError>;

/// Bridges provider-verified identities into the local identity model
pub struct FederatedAuthService {
    store: Arc<dyn UserStore>,
    token_service: Arc<TokenService>,
    bcrypt_cost: u32,
}

impl FederatedAuthService {
    /// Create the bridge over the identity store and token service
    pub fn new(store: Arc<dyn UserStore>, token_service: Arc<TokenService>) -> Self {
        Self {
            store,
            token_service,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost factor
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Resolve a provider callback into one of four terminal outcomes.
    ///
    /// Only the combination "unknown email + register intent" mints a
    /// bridging token; everything else either signs in immediately or
    /// signals the mismatch back to the client.
    pub async fn handle_callback(
        &self,
        email: &str,
        display_name: Option<&str>,
        intent: AuthIntent,
    ) -> FederatedResult<FederatedOutcome> {
        let email = normalize_email(email);
        let existing = self.store.find_by_email(&email).await?;

        let outcome = match (existing, intent) {
            (Some(_), AuthIntent::Register) => FederatedOutcome::AlreadyRegistered,
            (Some(user), AuthIntent::Login) => {
                let token = self.token_service.issue_session(&user.username)?;
                info!("federated login for {}", user.username);
                FederatedOutcome::SignedIn { token }
            }
            (None, AuthIntent::Login) => FederatedOutcome::AccountNotFound,
            (None, AuthIntent::Register) => {
                let bridge_token = self.token_service.issue_bridge(&email)?;
                info!("federated registration handoff for {}", email);
                FederatedOutcome::CompleteRegistration {
                    email,
                    display_name: display_name.unwrap_or_default().to_string(),
                    bridge_token,
                }
            }
        };

        Ok(outcome)
    }

    /// Complete a federated registration.
    ///
    /// The bridging token is validated against the submitted email before
    /// any identity is created; a caller that never passed through the
    /// provider cannot mint an account by hitting this directly.
    pub async fn complete_registration(
        &self,
        request: CompleteRegistrationRequest,
    ) -> FederatedResult<(User, String)> {
        if !validate_username(&request.username) {
            return Err(FederatedError::Validation(
                "Username must be 3-64 characters of letters, digits, dots, underscores, or hyphens"
                    .to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        self.token_service
            .validate_bridge(&request.temp_token, &email)
            .map_err(|_| FederatedError::InvalidBridgeToken)?;

        let password_hash = hash_password_with_cost(&request.password, self.bcrypt_cost)?;
        let record = self
            .store
            .insert_user(NewUser {
                username: request.username,
                email,
                password_hash,
                role: UserRole::Ordinary,
                verified: true,
            })
            .await?;

        let token = self.token_service.issue_session(&record.username)?;
        info!("federated registration completed for {}", record.username);
        Ok((record.into(), token))
    }
}

/// Provider-verified identity returned by the adapter
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
}

/// Thin Google OAuth 2.0 adapter: authorization URL, code exchange, and
/// userinfo fetch. Everything after the verified email is the bridge's job.
pub struct GoogleOAuthClient {
    client: BasicClient,
    http_client: reqwest::Client,
}

impl GoogleOAuthClient {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    const USERINFO_URL: &'static str = "https://openidconnect.googleapis.com/v1/userinfo";

    /// Create the adapter from provider configuration
    pub fn new(config: &GoogleOAuthConfig) -> AppResult<Self> {
        let auth_url = AuthUrl::new(Self::AUTH_URL.to_string())
            .map_err(|e| AppError::Configuration(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(Self::TOKEN_URL.to_string())
            .map_err(|e| AppError::Configuration(format!("Invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| AppError::Configuration(format!("Invalid redirect URI: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
        })
    }

    /// Build the provider authorization redirect; returns the URL and the
    /// CSRF state token embedded in it
    pub fn authorization_url(&self) -> (String, String) {
        let (url, csrf) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        (url.to_string(), csrf.secret().clone())
    }

    /// Exchange the callback code and fetch the provider-verified identity
    pub async fn fetch_verified_identity(&self, code: &str) -> AppResult<ProviderIdentity> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| AppError::ExternalService(format!("Token exchange failed: {}", e)))?;

        let userinfo: GoogleUserInfo = self
            .http_client
            .get(Self::USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Userinfo request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Userinfo response invalid: {}", e)))?;

        if !userinfo.email_verified {
            return Err(AppError::Unauthorized(
                "Provider has not verified this email".to_string(),
            ));
        }

        Ok(ProviderIdentity {
            email: userinfo.email,
            display_name: userinfo.name,
        })
    }
}

//! API Route Definitions
//!
//! Route construction through a builder with per-group toggles, so
//! deployments can expose only the endpoint groups they need (for example a
//! login-only instance without federated login or analysis).

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};
use super::middleware::auth_gate;
use super::oauth_handlers;

/// Builder for creating API routes with configurable endpoint groups
#[derive(Default)]
pub struct RouterBuilder {
    /// Health check endpoint (GET /health)
    health_check: bool,
    /// Registration and the two-step login flow, logout, profile
    auth: bool,
    /// The forgot-password OTP flow
    password_reset: bool,
    /// Secret-verified account deletion
    account: bool,
    /// Federated login: provider redirect, callback, registration completion
    federated: bool,
    /// Protected analysis operation and usage introspection
    analysis: bool,
}

impl RouterBuilder {
    /// Creates a builder with all groups disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with every endpoint group enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            password_reset: true,
            account: true,
            federated: true,
            analysis: true,
        }
    }

    /// Creates a builder with only the authentication core: login, logout,
    /// profile, password reset
    pub fn with_auth_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            password_reset: true,
            account: false,
            federated: false,
            analysis: false,
        }
    }

    /// Enables or disables the health check endpoint
    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    /// Enables or disables registration, login, logout, and profile
    pub fn auth(mut self, enabled: bool) -> Self {
        self.auth = enabled;
        self
    }

    /// Enables or disables the password reset flow
    pub fn password_reset(mut self, enabled: bool) -> Self {
        self.password_reset = enabled;
        self
    }

    /// Enables or disables account deletion
    pub fn account(mut self, enabled: bool) -> Self {
        self.account = enabled;
        self
    }

    /// Enables or disables federated login
    pub fn federated(mut self, enabled: bool) -> Self {
        self.federated = enabled;
        self
    }

    /// Enables or disables analysis and usage introspection
    pub fn analysis(mut self, enabled: bool) -> Self {
        self.analysis = enabled;
        self
    }

    /// Builds the router.
    ///
    /// Every `/api` route passes through the authentication gate; the
    /// handlers that require a caller enforce it via the `AuthUser`
    /// extractor.
    pub fn build(self, state: AppState) -> Router {
        let mut api = Router::new();

        if self.auth {
            api = api
                .route("/auth/register", post(handlers::register))
                .route("/auth/login", post(handlers::login))
                .route("/auth/login/verify", post(handlers::verify_login))
                .route("/auth/logout", post(handlers::logout))
                .route("/auth/profile", get(handlers::profile));
        }

        if self.password_reset {
            api = api
                .route(
                    "/auth/forgot-password/send-otp",
                    post(handlers::forgot_password_send_otp),
                )
                .route(
                    "/auth/forgot-password/verify-otp",
                    post(handlers::forgot_password_verify_otp),
                )
                .route(
                    "/auth/forgot-password/reset",
                    post(handlers::forgot_password_reset),
                );
        }

        if self.account {
            api = api.route("/users/delete-account", post(handlers::delete_account));
        }

        if self.federated {
            api = api
                .route("/auth/oauth2/google", get(oauth_handlers::google_init))
                .route("/auth/oauth2/callback", get(oauth_handlers::google_callback))
                .route("/auth/oauth-complete", post(oauth_handlers::oauth_complete));
        }

        if self.analysis {
            api = api
                .route("/contracts/analyze", post(handlers::analyze_contract))
                .route("/usage/remaining", get(handlers::usage_remaining));
        }

        let api = api.layer(from_fn_with_state(state.clone(), auth_gate));

        let mut router = Router::new().nest("/api", api);

        if self.health_check {
            router = router.route("/health", get(handlers::health_check));
        }

        router.with_state(state)
    }
}

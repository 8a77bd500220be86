//! Session & Access Control Service
//!
//! Authenticates identities and governs how often they may invoke the
//! protected contract-analysis operation. The core is the multi-factor
//! login orchestration (password + one-time code), signed-token issuance
//! and validation, token revocation, per-identity rate limiting, and the
//! federated login bridge that merges an OAuth-style provider outcome into
//! the same token and identity model.
//!
//! # Architecture
//!
//! - **API layer**: axum handlers, the bearer-token gate, and configurable
//!   routing
//! - **Service layer**: token issuance/validation, the revocation list, OTP
//!   challenges, token-bucket rate limiting, and the flows orchestrating
//!   them
//! - **Store**: the narrow identity-store interface with PostgreSQL and
//!   in-memory implementations
//! - **Models**: identities, claims, and request/response structures
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use auth_service::{
//!     api::{AppState, RouterBuilder},
//!     service::{
//!         AuthService, FederatedAuthService, OtpService, RateLimitService, RevocationList,
//!         TokenService,
//!     },
//!     store::{memory::InMemoryUserStore, UserStore},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
//!     let token_service = Arc::new(TokenService::new("a-32-byte-minimum-signing-secret!", 60, 15));
//!     let revocation_list = Arc::new(RevocationList::new());
//!     let otp_service = Arc::new(OtpService::new(Arc::clone(&store), None, 5));
//!     let rate_limit_service = Arc::new(RateLimitService::with_default_config(Arc::clone(&store)));
//!     let auth_service = Arc::new(AuthService::new(
//!         Arc::clone(&store),
//!         Arc::clone(&otp_service),
//!         Arc::clone(&token_service),
//!         Arc::clone(&revocation_list),
//!     ));
//!     let federated_auth_service = Arc::new(FederatedAuthService::new(
//!         Arc::clone(&store),
//!         Arc::clone(&token_service),
//!     ));
//!
//!     let state = AppState {
//!         auth_service,
//!         token_service,
//!         revocation_list,
//!         rate_limit_service,
//!         federated_auth_service,
//!         google_oauth: None,
//!         analyzer: None,
//!         store,
//!         frontend_base_url: String::new(),
//!     };
//!
//!     let app = RouterBuilder::with_all_routes().build(state);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Configuration management for all service settings
pub mod config;

/// Data models and request/response structures
pub mod models;

/// Business logic: tokens, revocation, challenges, rate limiting
pub mod service;

/// Identity store interface and implementations
pub mod store;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{AppState, AuthUser, RouterBuilder};
pub use models::{
    AuthIntent, FederatedOutcome, NewUser, TokenClaims, TokenPurpose, User, UserContext,
    UserRecord, UserRole,
};
pub use service::{
    AuthService, ContractAnalyzer, EmailService, FederatedAuthService, GoogleOAuthClient,
    OtpService, RateLimitService, RevocationList, TokenService,
};
pub use utils::error::{AppError, AppResult, ErrorResponse};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

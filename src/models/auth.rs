//! Authentication Models
//!
//! Claim sets for signed tokens, the per-request authenticated context, and
//! the federated-login vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a token authorizes.
///
/// A session token proves a completed login; a bridge token only authorizes
/// the one-time registration-completion step after a federated login for an
/// unknown email. The claim keeps one from ever passing as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Bridge,
}

/// Signed claim set binding a subject to a validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the identity's login name for session tokens, the
    /// provider-verified email for bridge tokens
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// What this token authorizes
    pub purpose: TokenPurpose,
}

impl TokenClaims {
    /// Create a new claim set
    pub fn new(
        subject: &str,
        purpose: TokenPurpose,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            purpose,
        }
    }

    /// Expiry as a timestamp type
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Authenticated identity bound to a request by the middleware
#[derive(Debug, Clone)]
pub struct UserContext {
    /// Login name extracted from the token subject
    pub username: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

impl UserContext {
    /// Build the request context from validated session claims
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            username: claims.sub.clone(),
            expires_at: claims.expires_at(),
        }
    }
}

/// Client intent carried through the federated login flow.
///
/// Transported in the short-lived `auth_intent` cookie; absent or
/// unrecognized values fall back to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIntent {
    Login,
    Register,
}

impl AuthIntent {
    pub fn from_cookie_value(value: Option<&str>) -> Self {
        match value {
            Some("register") => AuthIntent::Register,
            _ => AuthIntent::Login,
        }
    }
}

/// Terminal outcome of a federated provider callback
#[derive(Debug, Clone)]
pub enum FederatedOutcome {
    /// Identity existed and the intent allowed login: session established
    SignedIn { token: String },

    /// Identity already exists but the client meant to register
    AlreadyRegistered,

    /// No identity for this email and the client meant to log in
    AccountNotFound,

    /// No identity: hand off to registration completion with a bridging
    /// token bound to the provider-verified email
    CompleteRegistration {
        email: String,
        display_name: String,
        bridge_token: String,
    },
}

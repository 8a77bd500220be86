//! Token Service
//!
//! Issues and validates signed, time-bounded tokens binding a subject to an
//! expiry. Stateless: a pure function of the signing secret and the clock.
//! Revocation is deliberately not handled here; callers layer it by
//! consulting the [`RevocationList`](super::revocation::RevocationList).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::models::{TokenClaims, TokenPurpose};
use crate::utils::error::AppError;

/// Token service specific errors.
///
/// Everything maps to the same external "invalid token" outcome; the expired
/// variant exists so callers can log it distinctly, nothing more.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token is invalid")]
    Invalid,

    #[error("Token subject does not match")]
    SubjectMismatch,

    #[error("Token purpose does not match")]
    PurposeMismatch,

    #[error("Token generation failed: {0}")]
    Generation(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Generation(msg) => {
                AppError::Internal(format!("Token generation failed: {}", msg))
            }
            // Callers must treat invalid uniformly regardless of why.
            _ => AppError::Unauthorized("Invalid or expired token".to_string()),
        }
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Signed-token issuance and validation
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
    bridge_ttl: Duration,
}

impl TokenService {
    /// Create a token service over a shared signing secret.
    ///
    /// Session and bridge TTLs are independent; bridge tokens only authorize
    /// the federated registration-completion step and should stay short.
    pub fn new(secret: &str, session_ttl_minutes: i64, bridge_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::minutes(session_ttl_minutes),
            bridge_ttl: Duration::minutes(bridge_ttl_minutes),
        }
    }

    /// Issue a session token for a logged-in identity
    pub fn issue_session(&self, subject: &str) -> TokenResult<String> {
        self.issue(subject, TokenPurpose::Session, self.session_ttl)
    }

    /// Issue a short-lived bridging token bound to a provider-verified email
    pub fn issue_bridge(&self, email: &str) -> TokenResult<String> {
        self.issue(email, TokenPurpose::Bridge, self.bridge_ttl)
    }

    fn issue(&self, subject: &str, purpose: TokenPurpose, ttl: Duration) -> TokenResult<String> {
        let now = Utc::now();
        let claims = TokenClaims::new(subject, purpose, now, now + ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature and expiry, optionally pinning the subject.
    ///
    /// Fails closed: any parse, signature, or expiry problem is an error,
    /// never a panic. A token is rejected from the instant `exp` is reached.
    pub fn validate(&self, token: &str, expected_subject: Option<&str>) -> TokenResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;
        let claims = data.claims;

        // The library accepts exp == now; the contract is exclusive of the
        // expiry instant.
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if let Some(expected) = expected_subject {
            if claims.sub != expected {
                return Err(TokenError::SubjectMismatch);
            }
        }

        Ok(claims)
    }

    /// Validate a token that must be a session token
    pub fn validate_session(&self, token: &str) -> TokenResult<TokenClaims> {
        let claims = self.validate(token, None)?;
        if claims.purpose != TokenPurpose::Session {
            return Err(TokenError::PurposeMismatch);
        }
        Ok(claims)
    }

    /// Validate a token that must be a bridging token for `email`
    pub fn validate_bridge(&self, token: &str, email: &str) -> TokenResult<TokenClaims> {
        let claims = self.validate(token, Some(email))?;
        if claims.purpose != TokenPurpose::Bridge {
            return Err(TokenError::PurposeMismatch);
        }
        Ok(claims)
    }
}

//! OTP Challenge Manager
//!
//! Generates, stores, and validates the short-lived numeric codes used as
//! the login second factor and as the password-reset gate. Codes are stored
//! through the identity store; a new challenge implicitly invalidates any
//! prior one by overwriting it, and successful validation clears the code
//! atomically before anything is issued on its strength.

use chrono::{Duration, Utc};
use log::warn;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::service::email::EmailService;
use crate::store::{StoreError, UserStore};
use crate::utils::error::AppError;
use crate::utils::security::{constant_time_compare, generate_otp_code};

/// What a challenge gates; selects the notification template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Login,
    PasswordReset,
}

/// OTP validation errors
#[derive(Error, Debug)]
pub enum OtpError {
    /// Wrong code, no pending challenge, or a lost validation race
    #[error("Invalid one-time code")]
    Invalid,

    /// The challenge window elapsed; surfaced distinctly so clients can
    /// offer a resend instead of a retry
    #[error("One-time code has expired")]
    Expired,

    /// Out-of-band delivery failed
    #[error("Failed to deliver one-time code: {0}")]
    Delivery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Invalid => AppError::Unauthorized("Invalid one-time code".to_string()),
            OtpError::Expired => AppError::Expired(
                "One-time code has expired. Request a new one to continue.".to_string(),
            ),
            OtpError::Delivery(msg) => AppError::ExternalService(msg),
            OtpError::Store(e) => e.into(),
        }
    }
}

/// Result type for OTP operations
pub type OtpResult<T> = Result<T, OtpError>;

/// Issues and validates one-time-code challenges
pub struct OtpService {
    store: Arc<dyn UserStore>,
    email_service: Option<Arc<EmailService>>,
    window: Duration,
}

impl OtpService {
    /// Create a challenge manager with the given validity window
    pub fn new(
        store: Arc<dyn UserStore>,
        email_service: Option<Arc<EmailService>>,
        window_minutes: i64,
    ) -> Self {
        Self {
            store,
            email_service,
            window: Duration::minutes(window_minutes),
        }
    }

    /// Issue a fresh challenge for the identity and dispatch it out of band.
    ///
    /// Overwrites any pending challenge, so at most one code is live per
    /// identity at a time.
    pub async fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        purpose: OtpPurpose,
    ) -> OtpResult<()> {
        let code = generate_otp_code();
        let expires_at = Utc::now() + self.window;

        self.store
            .set_pending_code(user_id, &code, expires_at)
            .await?;

        match &self.email_service {
            Some(service) => {
                let minutes = self.window.num_minutes();
                let result = match purpose {
                    OtpPurpose::Login => {
                        service.send_login_otp(email, username, &code, minutes).await
                    }
                    OtpPurpose::PasswordReset => {
                        service.send_reset_otp(email, username, &code, minutes).await
                    }
                };
                result.map_err(|e| OtpError::Delivery(e.to_string()))?;
            }
            None => {
                warn!(
                    "email service not configured; one-time code for {} was not delivered",
                    username
                );
            }
        }

        Ok(())
    }

    /// Validate and consume a challenge.
    ///
    /// On success the stored code is cleared before returning, which is what
    /// makes a challenge single-use: a replay, or the loser of a concurrent
    /// validation race, sees `Invalid`.
    pub async fn validate(&self, user_id: Uuid, submitted: &str) -> OtpResult<()> {
        self.precheck(user_id, submitted).await?;

        if !self
            .store
            .clear_pending_code_if_matches(user_id, submitted)
            .await?
        {
            return Err(OtpError::Invalid);
        }

        Ok(())
    }

    /// Check a challenge without consuming it.
    ///
    /// Used by the password-reset flow's intermediate verification step; the
    /// final reset submission still goes through [`validate`](Self::validate)
    /// and clears the code.
    pub async fn check(&self, user_id: Uuid, submitted: &str) -> OtpResult<()> {
        self.precheck(user_id, submitted).await
    }

    async fn precheck(&self, user_id: Uuid, submitted: &str) -> OtpResult<()> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(OtpError::Invalid)?;

        let code = user.pending_code.as_deref().ok_or(OtpError::Invalid)?;
        let expires_at = user.pending_code_expires_at.ok_or(OtpError::Invalid)?;

        // Expiry wins over a wrong code: a correct code after the window is
        // still Expired.
        if Utc::now() >= expires_at {
            return Err(OtpError::Expired);
        }
        if !constant_time_compare(code, submitted) {
            return Err(OtpError::Invalid);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserRecord, UserRole};
    use crate::store::memory::InMemoryUserStore;

    async fn setup() -> (Arc<InMemoryUserStore>, OtpService, UserRecord) {
        let store = Arc::new(InMemoryUserStore::new());
        let user = store
            .insert_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role: UserRole::Ordinary,
                verified: true,
            })
            .await
            .unwrap();

        let service = OtpService::new(Arc::clone(&store) as Arc<dyn UserStore>, None, 5);
        (store, service, user)
    }

    async fn issued_code(store: &InMemoryUserStore, username: &str) -> String {
        store
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap()
            .pending_code
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_stores_six_digit_code_with_expiry() {
        let (store, service, user) = setup().await;
        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::Login)
            .await
            .unwrap();

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        let code = stored.pending_code.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(stored.pending_code_expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_validate_consumes_challenge() {
        let (store, service, user) = setup().await;
        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::Login)
            .await
            .unwrap();
        let code = issued_code(&store, "alice").await;

        service.validate(user.id, &code).await.unwrap();

        // Replay of the same code is rejected once consumed.
        assert!(matches!(
            service.validate(user.id, &code).await,
            Err(OtpError::Invalid)
        ));
        assert!(store
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .pending_code
            .is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_rejected_without_consuming() {
        let (store, service, user) = setup().await;
        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::Login)
            .await
            .unwrap();
        let code = issued_code(&store, "alice").await;

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(matches!(
            service.validate(user.id, wrong).await,
            Err(OtpError::Invalid)
        ));

        // The real code still works afterwards.
        service.validate(user.id, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_rejected_even_if_correct() {
        let (store, service, user) = setup().await;
        store
            .set_pending_code(user.id, "123456", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert!(matches!(
            service.validate(user.id, "123456").await,
            Err(OtpError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_new_challenge_overwrites_prior() {
        let (store, service, user) = setup().await;
        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::Login)
            .await
            .unwrap();
        let first = issued_code(&store, "alice").await;

        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::PasswordReset)
            .await
            .unwrap();
        let second = issued_code(&store, "alice").await;

        if first != second {
            assert!(matches!(
                service.validate(user.id, &first).await,
                Err(OtpError::Invalid)
            ));
        }
        service.validate(user.id, &second).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_does_not_consume() {
        let (store, service, user) = setup().await;
        service
            .issue(user.id, "alice", "alice@example.com", OtpPurpose::PasswordReset)
            .await
            .unwrap();
        let code = issued_code(&store, "alice").await;

        service.check(user.id, &code).await.unwrap();
        service.check(user.id, &code).await.unwrap();

        // Still consumable after any number of checks.
        service.validate(user.id, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_pending_challenge_rejected() {
        let (_store, service, user) = setup().await;
        assert!(matches!(
            service.validate(user.id, "123456").await,
            Err(OtpError::Invalid)
        ));
    }
}

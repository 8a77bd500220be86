//! Authentication Service
//!
//! Orchestrates the multi-factor login flow, password reset, logout, and
//! account lifecycle over the identity store, OTP challenge manager, token
//! service, and revocation list.

use log::info;
use std::sync::Arc;
use thiserror::Error;

use crate::models::requests::RegisterRequest;
use crate::models::{NewUser, User};
use crate::service::otp::{OtpError, OtpPurpose, OtpService};
use crate::service::revocation::RevocationList;
use crate::service::token::{TokenError, TokenService};
use crate::store::{StoreError, UserStore};
use crate::utils::error::AppError;
use crate::utils::security::{hash_password_with_cost, verify_password, DEFAULT_BCRYPT_COST};
use crate::utils::validation::{normalize_email, validate_username};

/// Authentication service specific errors
#[derive(Error, Debug)]
pub enum AuthServiceError {
    /// Wrong username/password combination. Deliberately does not reveal
    /// whether the username exists.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Login attempted before the account's email channel was verified
    #[error("Account not verified")]
    AccountNotVerified,

    /// Identity lookup by an explicit reference (profile, reset email) failed
    #[error("User not found")]
    UserNotFound,

    /// Input validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// One-time-code failure
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Token issuance failure
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Identity store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failure
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => {
                AppError::Unauthorized("Invalid username or password".to_string())
            }
            AuthServiceError::AccountNotVerified => {
                AppError::Unauthorized("Account not verified".to_string())
            }
            AuthServiceError::UserNotFound => AppError::NotFound("User not found".to_string()),
            AuthServiceError::Validation(msg) => AppError::Validation(msg),
            AuthServiceError::Otp(e) => e.into(),
            AuthServiceError::Token(e) => e.into(),
            AuthServiceError::Store(e) => e.into(),
            AuthServiceError::Hashing(e) => AppError::Hashing(e),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthServiceError>;

/// Core authentication orchestration
pub struct AuthService {
    store: Arc<dyn UserStore>,
    otp_service: Arc<OtpService>,
    token_service: Arc<TokenService>,
    revocation_list: Arc<RevocationList>,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create the authentication service
    pub fn new(
        store: Arc<dyn UserStore>,
        otp_service: Arc<OtpService>,
        token_service: Arc<TokenService>,
        revocation_list: Arc<RevocationList>,
    ) -> Self {
        Self {
            store,
            otp_service,
            token_service,
            revocation_list,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost factor (lower in tests, higher for hardened
    /// deployments)
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Register a new identity
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        if !validate_username(&request.username) {
            return Err(AuthServiceError::Validation(
                "Username must be 3-64 characters of letters, digits, dots, underscores, or hyphens"
                    .to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        let password_hash = hash_password_with_cost(&request.password, self.bcrypt_cost)?;

        let record = self
            .store
            .insert_user(NewUser {
                username: request.username,
                email,
                password_hash,
                role: request.role.unwrap_or_default(),
                verified: true,
            })
            .await?;

        info!("registered identity {}", record.username);
        Ok(record.into())
    }

    /// First login factor: check the secret, then dispatch a one-time code.
    ///
    /// No token is issued here; the caller gets one only after the second
    /// factor succeeds.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<()> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }
        if !user.verified {
            return Err(AuthServiceError::AccountNotVerified);
        }

        self.otp_service
            .issue(user.id, &user.username, &user.email, OtpPurpose::Login)
            .await?;

        info!("login challenge issued for {}", user.username);
        Ok(())
    }

    /// Second login factor: consume the one-time code and issue a session
    /// token
    pub async fn verify_login(&self, username: &str, code: &str) -> AuthResult<String> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        self.otp_service.validate(user.id, code).await?;

        let token = self.token_service.issue_session(&user.username)?;
        info!("login completed for {}", user.username);
        Ok(token)
    }

    /// Invalidate the presented bearer token ahead of its natural expiry
    pub fn logout(&self, raw_token: &str) {
        self.revocation_list.revoke(raw_token);
        info!("token revoked at logout");
    }

    /// Public record of the authenticated identity
    pub async fn profile(&self, username: &str) -> AuthResult<User> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        Ok(user.into())
    }

    /// Destroy the identity after re-verifying its secret
    pub async fn delete_account(&self, username: &str, password: &str) -> AuthResult<()> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        self.store.delete_user(user.id).await?;
        info!("account {} deleted", username);
        Ok(())
    }

    /// Start the password reset flow: dispatch a one-time code to the email
    pub async fn initiate_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        self.otp_service
            .issue(user.id, &user.username, &user.email, OtpPurpose::PasswordReset)
            .await?;

        info!("password reset challenge issued for {}", user.username);
        Ok(())
    }

    /// Check the reset code without consuming it (pre-check before the
    /// client shows the new-password form)
    pub async fn check_reset_code(&self, email: &str, code: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        self.otp_service.check(user.id, code).await?;
        Ok(())
    }

    /// Complete the password reset: consume the code and store the new
    /// secret
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        self.otp_service.validate(user.id, code).await?;

        let password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)?;
        self.store.update_password(user.id, &password_hash).await?;

        info!("password reset completed for {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::store::memory::InMemoryUserStore;

    struct Fixture {
        store: Arc<InMemoryUserStore>,
        service: AuthService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryUserStore::new());
        let dyn_store: Arc<dyn UserStore> = Arc::clone(&store) as Arc<dyn UserStore>;
        let otp_service = Arc::new(OtpService::new(Arc::clone(&dyn_store), None, 5));
        let token_service = Arc::new(TokenService::new(
            "test_secret_key_with_enough_bytes",
            60,
            15,
        ));
        let revocation_list = Arc::new(RevocationList::new());

        let service = AuthService::new(dyn_store, otp_service, token_service, revocation_list)
            .with_bcrypt_cost(4);

        Fixture { store, service }
    }

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    async fn pending_code(store: &InMemoryUserStore, username: &str) -> String {
        store
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap()
            .pending_code
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_defaults_to_ordinary_role() {
        let f = fixture();
        let user = f
            .service
            .register(register_request("alice", "Alice@Example.com", "s3cret-pass"))
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Ordinary);
        assert!(user.verified);
        // Email is normalized before storage.
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();

        let dup_username = f
            .service
            .register(register_request("alice", "other@example.com", "s3cret-pass"))
            .await;
        assert!(matches!(
            dup_username,
            Err(AuthServiceError::Store(StoreError::DuplicateUsername))
        ));

        let dup_email = f
            .service
            .register(register_request("bob", "alice@example.com", "s3cret-pass"))
            .await;
        assert!(matches!(
            dup_email,
            Err(AuthServiceError::Store(StoreError::DuplicateEmail))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_username() {
        let f = fixture();
        let result = f
            .service
            .register(register_request("no spaces!", "a@example.com", "s3cret-pass"))
            .await;
        assert!(matches!(result, Err(AuthServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_full_login_flow_issues_session_token() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();

        // Factor one: no token yet, a challenge appears in the store.
        f.service.login("alice", "s3cret-pass").await.unwrap();
        let code = pending_code(&f.store, "alice").await;

        // Factor two: the code buys a session token.
        let token = f.service.verify_login("alice", &code).await.unwrap();
        assert!(!token.is_empty());

        // The consumed code cannot buy a second one.
        assert!(matches!(
            f.service.verify_login("alice", &code).await,
            Err(AuthServiceError::Otp(OtpError::Invalid))
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.login("alice", "wrong").await,
            Err(AuthServiceError::InvalidCredentials)
        ));
        // No challenge was issued.
        let user = f.store.find_by_username("alice").await.unwrap().unwrap();
        assert!(user.pending_code.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_user_uniformly() {
        let f = fixture();
        assert!(matches!(
            f.service.login("ghost", "whatever").await,
            Err(AuthServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_unverified_account() {
        let f = fixture();
        f.store
            .insert_user(NewUser {
                username: "pending".into(),
                email: "pending@example.com".into(),
                password_hash: hash_password_with_cost("s3cret-pass", 4).unwrap(),
                role: UserRole::Ordinary,
                verified: false,
            })
            .await
            .unwrap();

        assert!(matches!(
            f.service.login("pending", "s3cret-pass").await,
            Err(AuthServiceError::AccountNotVerified)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let f = fixture();
        f.service.logout("some-raw-token");
        assert!(f.service.revocation_list.is_revoked("some-raw-token"));
    }

    #[tokio::test]
    async fn test_delete_account_requires_secret() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.delete_account("alice", "wrong").await,
            Err(AuthServiceError::InvalidCredentials)
        ));
        assert!(f.store.find_by_username("alice").await.unwrap().is_some());

        f.service
            .delete_account("alice", "s3cret-pass")
            .await
            .unwrap();
        assert!(f.store.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();

        f.service
            .initiate_password_reset("alice@example.com")
            .await
            .unwrap();
        let code = pending_code(&f.store, "alice").await;

        // The pre-check does not consume the code.
        f.service
            .check_reset_code("alice@example.com", &code)
            .await
            .unwrap();

        f.service
            .reset_password("alice@example.com", &code, "n3w-password")
            .await
            .unwrap();

        // Old secret is dead, the new one logs in.
        assert!(matches!(
            f.service.login("alice", "s3cret-pass").await,
            Err(AuthServiceError::InvalidCredentials)
        ));
        f.service.login("alice", "n3w-password").await.unwrap();
    }

    #[tokio::test]
    async fn test_password_reset_rejects_wrong_code() {
        let f = fixture();
        f.service
            .register(register_request("alice", "alice@example.com", "s3cret-pass"))
            .await
            .unwrap();
        f.service
            .initiate_password_reset("alice@example.com")
            .await
            .unwrap();
        let code = pending_code(&f.store, "alice").await;

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(matches!(
            f.service
                .reset_password("alice@example.com", wrong, "n3w-password")
                .await,
            Err(AuthServiceError::Otp(OtpError::Invalid))
        ));

        // Secret unchanged.
        f.service.login("alice", "s3cret-pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.initiate_password_reset("ghost@example.com").await,
            Err(AuthServiceError::UserNotFound)
        ));
    }
}

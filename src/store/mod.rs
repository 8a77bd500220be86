//! Identity Store Interface
//!
//! The service only reads and writes identity records through the narrow
//! [`UserStore`] trait; everything behind it (schema, driver, transactions)
//! is the store implementation's concern. [`postgres::PgUserStore`] is the
//! production implementation; [`memory::InMemoryUserStore`] backs tests and
//! local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, UserRecord};
use crate::utils::error::AppError;

/// Errors surfaced by identity store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Identity not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => {
                AppError::Conflict("Username already exists".to_string())
            }
            StoreError::DuplicateEmail => AppError::Conflict("Email already exists".to_string()),
            StoreError::NotFound => AppError::NotFound("Identity not found".to_string()),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// Result type for identity store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow persistence interface for identity records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an identity by its unique identifier
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// Look up an identity by its unique login name
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    /// Look up an identity by its unique email address
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Create a new identity; fails with a duplicate error if the username
    /// or email is already taken
    async fn insert_user(&self, new_user: NewUser) -> StoreResult<UserRecord>;

    /// Store a pending one-time code and its expiry, overwriting any prior
    /// challenge for the identity
    async fn set_pending_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Atomically clear the pending code if it equals `code`.
    ///
    /// Returns `true` only for the caller that actually cleared it; a
    /// concurrent validation racing on the same code observes `false`. This
    /// is the primitive that makes challenges single-use.
    async fn clear_pending_code_if_matches(&self, id: Uuid, code: &str) -> StoreResult<bool>;

    /// Replace the identity's password hash
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    /// Permanently remove an identity
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

    /// Verify the store is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

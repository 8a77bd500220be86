//! PostgreSQL Identity Store
//!
//! Production [`UserStore`] implementation over a sqlx connection pool.
//! Queries are runtime-checked so the crate builds without a live database;
//! the schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult, UserStore};
use crate::config::DatabaseConfig;
use crate::models::{NewUser, UserRecord};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, verified, \
     pending_code, pending_code_expires_at, created_at, updated_at";

/// Identity store backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Wrap an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration and run pending migrations
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.connect_timeout_seconds,
            ))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        Ok(Self::new(pool))
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_unique_violation(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.constraint() {
                Some("users_username_key") => return StoreError::DuplicateUsername,
                Some("users_email_key") => return StoreError::DuplicateEmail,
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<UserRecord> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, role, verified) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.role)
            .bind(new_user.verified)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_unique_violation)?;

        Ok(user)
    }

    async fn set_pending_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users \
             SET pending_code = $2, pending_code_expires_at = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn clear_pending_code_if_matches(&self, id: Uuid, code: &str) -> StoreResult<bool> {
        // The conditional UPDATE is the atomic compare-and-clear: of two
        // racing validations only one can match the still-set code.
        let result = sqlx::query(
            "UPDATE users \
             SET pending_code = NULL, pending_code_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND pending_code = $2",
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

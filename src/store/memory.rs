//! In-Memory Identity Store
//!
//! Process-local [`UserStore`] implementation used by the test suite and for
//! local development without a database. Mutations take the write lock, so
//! the compare-and-clear primitive is serialized the same way the SQL
//! conditional UPDATE is.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, UserStore};
use crate::models::{NewUser, UserRecord};

/// Identity store backed by a process-local map
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, UserRecord>> {
        self.users.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, UserRecord>> {
        self.users.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.read().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.read().values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<UserRecord> {
        let mut users = self.write();

        if users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            verified: new_user.verified,
            pending_code: None,
            pending_code_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn set_pending_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut users = self.write();
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        user.pending_code = Some(code.to_string());
        user.pending_code_expires_at = Some(expires_at);
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn clear_pending_code_if_matches(&self, id: Uuid, code: &str) -> StoreResult<bool> {
        let mut users = self.write();
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        if user.pending_code.as_deref() == Some(code) {
            user.pending_code = None;
            user.pending_code_expires_at = None;
            user.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut users = self.write();
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut users = self.write();
        users.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

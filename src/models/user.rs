//! Identity Models
//!
//! Data structures for registered identities and their access tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tier of an identity.
///
/// The tier selects the rate-limit policy applied to protected operations:
/// ordinary identities get a small fixed allowance, privileged identities an
/// effectively unlimited one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[sqlx(rename = "ORDINARY")]
    Ordinary,
    #[sqlx(rename = "PRIVILEGED")]
    Privileged,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Ordinary => "ORDINARY",
            UserRole::Privileged => "PRIVILEGED",
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Privileged)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ORDINARY" => Ok(UserRole::Ordinary),
            "PRIVILEGED" => Ok(UserRole::Privileged),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Ordinary
    }
}

/// Full identity record as held by the identity store.
///
/// Carries secret material (password hash, pending one-time code) and must
/// never be serialized into a response; use [`User`] for anything that leaves
/// the service.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// Unique identifier
    pub id: Uuid,
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// Access tier
    pub role: UserRole,
    /// Whether the account's email channel has been verified
    pub verified: bool,
    /// Pending one-time code, if a challenge is outstanding
    pub pending_code: Option<String>,
    /// Expiry of the pending one-time code
    pub pending_code_expires_at: Option<DateTime<Utc>>,
    /// When the identity was created
    pub created_at: DateTime<Utc>,
    /// When the identity was last updated
    pub updated_at: DateTime<Utc>,
}

/// Public view of an identity, safe to serialize into responses
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            role: record.role,
            verified: record.verified,
            created_at: record.created_at,
        }
    }
}

/// Payload for creating a new identity in the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub verified: bool,
}

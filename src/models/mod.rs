//! Data models and request/response structures

pub mod auth;
pub mod requests;
pub mod user;

pub use auth::{AuthIntent, FederatedOutcome, TokenClaims, TokenPurpose, UserContext};
pub use user::{NewUser, User, UserRecord, UserRole};

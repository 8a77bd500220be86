//! Configuration Module
//!
//! Environment-driven configuration for the service. Every security-relevant
//! knob (token TTLs, OTP window, bucket policies) is configurable; nothing is
//! hardcoded behavior.

use anyhow::{anyhow, Result};

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token issuance configuration
    pub jwt: JwtConfig,

    /// One-time-code window in minutes
    pub otp_window_minutes: i64,

    /// Base URL the federated flow redirects back to
    pub frontend_base_url: String,

    /// Google OAuth provider adapter, when configured
    pub oauth: Option<GoogleOAuthConfig>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

/// Token issuance configuration.
///
/// Session and bridge TTLs are independent: bridge tokens only authorize the
/// federated registration-completion step and stay short-lived.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub session_ttl_minutes: i64,
    pub bridge_ttl_minutes: i64,
}

/// Google OAuth provider configuration
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_PORT", 3000),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow!("DATABASE_URL environment variable is required"))?,
            max_connections: env::get_u32("DB_MAX_CONNECTIONS", 10),
            min_connections: env::get_u32("DB_MIN_CONNECTIONS", 1),
            connect_timeout_seconds: env::get_u64("DB_CONNECT_TIMEOUT", 10),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow!("JWT_SECRET environment variable is required"))?,
            session_ttl_minutes: env::get_i64("JWT_SESSION_TTL_MINUTES", 60),
            bridge_ttl_minutes: env::get_i64("JWT_BRIDGE_TTL_MINUTES", 15),
        };

        let oauth = if env::is_set("GOOGLE_CLIENT_ID") {
            Some(GoogleOAuthConfig {
                client_id: env::get_string("GOOGLE_CLIENT_ID", ""),
                client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                    .map_err(|_| anyhow!("GOOGLE_CLIENT_SECRET is required with GOOGLE_CLIENT_ID"))?,
                redirect_uri: env::get_string(
                    "GOOGLE_REDIRECT_URI",
                    "http://localhost:3000/api/auth/oauth2/callback",
                ),
            })
        } else {
            None
        };

        Ok(Self {
            server: ServerConfig::default(),
            database,
            jwt,
            otp_window_minutes: env::get_i64("OTP_WINDOW_MINUTES", 5),
            frontend_base_url: env::get_string("FRONTEND_BASE_URL", ""),
            oauth,
        })
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret.len() < 32 {
            return Err(anyhow!("JWT_SECRET must be at least 32 bytes"));
        }
        if self.jwt.session_ttl_minutes <= 0 || self.jwt.bridge_ttl_minutes <= 0 {
            return Err(anyhow!("Token TTLs must be positive"));
        }
        if self.otp_window_minutes <= 0 {
            return Err(anyhow!("OTP window must be positive"));
        }
        Ok(())
    }
}

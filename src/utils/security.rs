//! Security Utilities
//!
//! Password hashing, one-time-code generation, and comparison helpers.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, Rng};

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = DEFAULT_COST;

/// Number of digits in a one-time code
pub const OTP_CODE_LENGTH: usize = 6;

/// Generate a numeric one-time code.
///
/// Codes are drawn from the operating system's CSPRNG, not a general-purpose
/// generator, since they gate authentication.
pub fn generate_otp_code() -> String {
    OsRng.gen_range(100_000..=999_999).to_string()
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash_password_with_cost(password, DEFAULT_BCRYPT_COST)
}

/// Hash a password with custom bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Timing-safe string comparison
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

/// Create an expiration timestamp a number of minutes from now
pub fn create_expiration(duration_minutes: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::minutes(duration_minutes)
}

/// Check if a timestamp has expired
pub fn is_expired(expiry: DateTime<Utc>) -> bool {
    Utc::now() >= expiry
}

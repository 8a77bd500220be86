//! Rate Limiting Service
//!
//! Per-identity token buckets governing how many protected operations
//! (contract analyses) may run per unit time. Ordinary identities get a
//! small allowance replenished in a lump at interval boundaries; privileged
//! identities get a large, continuously refilled allowance that behaves as
//! unlimited.
//!
//! Buckets live in a concurrent map for the process lifetime. The policy is
//! fixed from the identity's role when the bucket is first created; a later
//! role change does not retighten or loosen an existing bucket.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::env;
use crate::models::UserRole;
use crate::store::{StoreError, UserStore};
use crate::utils::error::AppError;

/// Rate limiting specific errors
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Unknown identity")]
    UnknownIdentity,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::UnknownIdentity => AppError::NotFound("Unknown identity".to_string()),
            RateLimitError::Store(e) => e.into(),
        }
    }
}

/// Result type for rate limiting operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// How a bucket's allowance comes back over time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillMode {
    /// The full refill amount lands in a lump each time a whole period
    /// elapses; nothing is returned mid-period
    Interval,
    /// Tokens trickle back continuously, proportional to elapsed time
    Continuous,
}

/// Refill policy for one bucket
#[derive(Debug, Clone, Copy)]
pub struct BucketConfig {
    pub capacity: u64,
    pub refill_tokens: u64,
    pub refill_period: Duration,
    pub mode: RefillMode,
}

impl BucketConfig {
    /// Ordinary tier: a small fixed allowance per interval
    pub fn ordinary(capacity: u64, refill_minutes: i64) -> Self {
        Self {
            capacity,
            refill_tokens: capacity,
            refill_period: Duration::minutes(refill_minutes),
            mode: RefillMode::Interval,
        }
    }

    /// Privileged tier: a large burst capacity replenished continuously
    pub fn privileged(capacity: u64, refill_seconds: i64) -> Self {
        Self {
            capacity,
            refill_tokens: capacity,
            refill_period: Duration::seconds(refill_seconds),
            mode: RefillMode::Continuous,
        }
    }
}

/// Tier policies, selected by role at bucket creation
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub ordinary: BucketConfig,
    pub privileged: BucketConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ordinary: BucketConfig::ordinary(2, 60),
            privileged: BucketConfig::privileged(10_000, 60),
        }
    }
}

impl RateLimitConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            ordinary: BucketConfig::ordinary(
                env::get_u64("RATE_LIMIT_ORDINARY_CAPACITY", 2),
                env::get_i64("RATE_LIMIT_ORDINARY_REFILL_MINUTES", 60),
            ),
            privileged: BucketConfig::privileged(
                env::get_u64("RATE_LIMIT_PRIVILEGED_CAPACITY", 10_000),
                env::get_i64("RATE_LIMIT_PRIVILEGED_REFILL_SECONDS", 60),
            ),
        }
    }

    /// Policy for a role
    pub fn for_role(&self, role: UserRole) -> BucketConfig {
        match role {
            UserRole::Ordinary => self.ordinary,
            UserRole::Privileged => self.privileged,
        }
    }
}

/// One identity's bucket: refill is computed lazily on access, and
/// refill-plus-consume always runs under the map's per-entry exclusive
/// guard, so two concurrent consumers cannot interleave and overdraw.
#[derive(Debug)]
struct TokenBucket {
    config: BucketConfig,
    available: u64,
    last_refill: DateTime<Utc>,
    unlimited: bool,
}

impl TokenBucket {
    fn new(config: BucketConfig, unlimited: bool, now: DateTime<Utc>) -> Self {
        Self {
            config,
            available: config.capacity,
            last_refill: now,
            unlimited,
        }
    }

    fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed_ms = (now - self.last_refill).num_milliseconds();
        let period_ms = self.config.refill_period.num_milliseconds();
        if elapsed_ms <= 0 || period_ms <= 0 {
            return;
        }

        match self.config.mode {
            RefillMode::Interval => {
                let periods = elapsed_ms / period_ms;
                if periods > 0 {
                    let added = periods as u64 * self.config.refill_tokens;
                    self.available = (self.available + added).min(self.config.capacity);
                    self.last_refill += Duration::milliseconds(periods * period_ms);
                }
            }
            RefillMode::Continuous => {
                let added = (elapsed_ms as u128 * self.config.refill_tokens as u128
                    / period_ms as u128) as u64;
                if added > 0 {
                    self.available = (self.available + added).min(self.config.capacity);
                    if self.available == self.config.capacity {
                        self.last_refill = now;
                    } else {
                        // Advance only by the time the added tokens account
                        // for, keeping the fractional remainder.
                        let consumed_ms = (added as u128 * period_ms as u128
                            / self.config.refill_tokens as u128)
                            as i64;
                        self.last_refill += Duration::milliseconds(consumed_ms);
                    }
                }
            }
        }
    }

    fn try_consume(&mut self, now: DateTime<Utc>) -> bool {
        self.refill(now);
        if self.available >= 1 {
            self.available -= 1;
            true
        } else {
            false
        }
    }

    fn remaining(&mut self, now: DateTime<Utc>) -> u64 {
        self.refill(now);
        self.available
    }
}

/// Current allowance snapshot for one identity
#[derive(Debug, Clone, Copy)]
pub struct UsageStatus {
    pub remaining: u64,
    /// Explicit tier signal; clients must not infer "unlimited" from the
    /// size of `remaining`
    pub unlimited: bool,
}

/// Per-identity rate limiter over the identity store
pub struct RateLimitService {
    store: Arc<dyn UserStore>,
    config: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimitService {
    /// Create a rate limiter with explicit tier policies
    pub fn new(store: Arc<dyn UserStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config,
            buckets: DashMap::new(),
        }
    }

    /// Create with default tier policies
    pub fn with_default_config(store: Arc<dyn UserStore>) -> Self {
        Self::new(store, RateLimitConfig::default())
    }

    /// Attempt to consume one permit for the identity.
    ///
    /// `Ok(false)` means the allowance is exhausted; errors are reserved for
    /// unknown identities and store failures.
    pub async fn try_consume(&self, username: &str) -> RateLimitResult<bool> {
        let now = Utc::now();

        if let Some(mut bucket) = self.buckets.get_mut(username) {
            return Ok(bucket.try_consume(now));
        }

        // First access: read the role once, then create-if-absent. Two
        // racing first accesses both reach the entry call but only one
        // insert wins; the loser consumes from the winner's bucket.
        let role = self.role_of(username).await?;
        let mut bucket = self
            .buckets
            .entry(username.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.for_role(role), role.is_privileged(), now));

        Ok(bucket.try_consume(now))
    }

    /// Current allowance without consuming
    pub async fn remaining(&self, username: &str) -> RateLimitResult<UsageStatus> {
        let now = Utc::now();

        if let Some(mut bucket) = self.buckets.get_mut(username) {
            return Ok(UsageStatus {
                remaining: bucket.remaining(now),
                unlimited: bucket.unlimited,
            });
        }

        let role = self.role_of(username).await?;
        let mut bucket = self
            .buckets
            .entry(username.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.for_role(role), role.is_privileged(), now));

        Ok(UsageStatus {
            remaining: bucket.remaining(now),
            unlimited: bucket.unlimited,
        })
    }

    /// Number of live buckets (for monitoring)
    pub fn active_buckets(&self) -> usize {
        self.buckets.len()
    }

    async fn role_of(&self, username: &str) -> RateLimitResult<UserRole> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(RateLimitError::UnknownIdentity)?;
        Ok(user.role)
    }
}

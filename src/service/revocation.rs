//! Revocation List
//!
//! Tracks tokens that must be treated as invalid before their natural
//! expiry (logout). Revocation is orthogonal to signature and expiry
//! validity: a syntactically valid, unexpired token is still rejected once
//! revoked.
//!
//! Entries live in process memory for the process lifetime: nothing is
//! evicted, and a restart forgets them (a token revoked before the restart
//! is accepted again until its natural expiry). Acceptable for a
//! single-instance deployment where exposure is bounded by the session TTL;
//! a multi-instance deployment needs this externalized to a shared,
//! TTL-capable store.

use dashmap::DashSet;

/// Concurrent denylist of raw token strings
#[derive(Default)]
pub struct RevocationList {
    revoked: DashSet<String>,
}

impl RevocationList {
    /// Create an empty revocation list
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw token; idempotent
    pub fn revoke(&self, raw_token: &str) {
        self.revoked.insert(raw_token.to_string());
    }

    /// Membership check against the raw token string
    pub fn is_revoked(&self, raw_token: &str) -> bool {
        self.revoked.contains(raw_token)
    }

    /// Number of revoked entries (for monitoring)
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

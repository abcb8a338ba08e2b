//! Lock handles and owner tokens

use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// How a lease was taken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    /// Sole holder; stored value is the owner token.
    Exclusive,
    /// One of possibly many shared holders.
    Shared,
}

/// Proof of a lease acquired on one resource key.
///
/// `lease_deadline` is the local estimate of when the store will expire the
/// record. The store is authoritative: after the deadline the handle may no
/// longer own anything, which `release` and `extend` detect atomically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockHandle {
    resource_key: String,
    owner_token: String,
    lease_deadline: Instant,
    mode: LockMode,
}

impl LockHandle {
    pub(crate) fn new(
        resource_key: &str,
        owner_token: String,
        lease: Duration,
        mode: LockMode,
    ) -> Self {
        Self {
            resource_key: resource_key.to_string(),
            owner_token,
            lease_deadline: Instant::now() + lease,
            mode,
        }
    }

    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn owner_token(&self) -> &str {
        &self.owner_token
    }

    pub fn lease_deadline(&self) -> Instant {
        self.lease_deadline
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Whether the local lease estimate has run out.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.lease_deadline
    }

    pub(crate) fn renewed(&mut self, lease: Duration) {
        self.lease_deadline = Instant::now() + lease;
    }
}

/// Fresh owner token, unique per acquisition attempt.
pub fn new_owner_token() -> String {
    Uuid::new_v4().to_string()
}

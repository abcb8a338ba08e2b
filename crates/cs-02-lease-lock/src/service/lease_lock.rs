//! Lease Lock Service
//!
//! State machine per resource key: `UNLOCKED → LOCKED(owner, deadline) → UNLOCKED`.
//!
//! - Acquire is one atomic set-if-absent-with-expiry. A set followed by a
//!   separate expire is never issued: a crash between the two leaves a
//!   record that never expires.
//! - Release is one atomic compare-and-delete on the owner token. A
//!   read followed by a separate delete is never issued: the lease could
//!   expire and be re-acquired in between, and the delete would remove the
//!   new owner's record.
//! - Expiry belongs to the store. No sweeper runs here.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use shared_store::KeyValueStore;

use crate::domain::{new_owner_token, BackoffPolicy, LockHandle, LockMode};
use crate::error::LockError;
use crate::watchdog::LeaseWatchdog;

/// Distributed lease lock over the shared store.
///
/// Non-blocking by contract: `try_acquire` answers immediately. Waiting is
/// opt-in through `acquire_with_backoff`, always bounded by a caller deadline.
pub struct LeaseLock<S: KeyValueStore> {
    store: Arc<S>,
    backoff: BackoffPolicy,
}

impl<S: KeyValueStore> Clone for LeaseLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            backoff: self.backoff.clone(),
        }
    }
}

impl<S: KeyValueStore + 'static> LeaseLock<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_backoff(store, BackoffPolicy::default())
    }

    pub fn with_backoff(store: Arc<S>, backoff: BackoffPolicy) -> Self {
        Self { store, backoff }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Try to take an exclusive lease on `resource_key`.
    ///
    /// Returns `None` immediately if any holder (exclusive or shared) exists.
    pub async fn try_acquire(
        &self,
        resource_key: &str,
        lease: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        validate(resource_key, lease)?;
        let token = new_owner_token();

        let acquired = self
            .store
            .set_if_absent_with_expiry(resource_key, token.as_bytes(), lease)
            .await?;

        if acquired {
            debug!(resource = resource_key, lease_ms = lease.as_millis() as u64, "Lease acquired");
            Ok(Some(LockHandle::new(resource_key, token, lease, LockMode::Exclusive)))
        } else {
            debug!(resource = resource_key, "Lease contended");
            Ok(None)
        }
    }

    /// Same as [`LeaseLock::try_acquire`]; the write side of a shared/exclusive lock.
    pub async fn try_acquire_exclusive(
        &self,
        resource_key: &str,
        lease: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        self.try_acquire(resource_key, lease).await
    }

    /// Try to join the shared holders of `resource_key`.
    ///
    /// Shared holders coexist; the attempt fails while an exclusive lease exists.
    pub async fn try_acquire_shared(
        &self,
        resource_key: &str,
        lease: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        validate(resource_key, lease)?;
        let token = new_owner_token();

        if self.store.add_shared_holder(resource_key, &token, lease).await? {
            debug!(resource = resource_key, "Shared lease acquired");
            Ok(Some(LockHandle::new(resource_key, token, lease, LockMode::Shared)))
        } else {
            debug!(resource = resource_key, "Shared lease refused, exclusive holder present");
            Ok(None)
        }
    }

    /// Poll `try_acquire` with jittered exponential backoff until acquired or `max_wait` elapses.
    ///
    /// Returns `None` on timeout. Dropping the future cancels the wait.
    pub async fn acquire_with_backoff(
        &self,
        resource_key: &str,
        lease: Duration,
        max_wait: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        let give_up_at = Instant::now() + max_wait;
        let mut backoff = self.backoff.schedule();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(handle) = self.try_acquire(resource_key, lease).await? {
                return Ok(Some(handle));
            }

            let now = Instant::now();
            if now >= give_up_at {
                debug!(resource = resource_key, attempts, "Gave up waiting for lease");
                return Ok(None);
            }
            let delay = backoff.next_delay().min(give_up_at - now);
            tokio::time::sleep(delay).await;
        }
    }

    /// Release a lease if, and only if, `handle` still owns it.
    ///
    /// Returns `false` (and deletes nothing) when the lease already expired
    /// and possibly went to another owner.
    pub async fn release(&self, handle: &LockHandle) -> Result<bool, LockError> {
        let released = match handle.mode() {
            LockMode::Exclusive => {
                self.store
                    .compare_and_delete(handle.resource_key(), handle.owner_token().as_bytes())
                    .await?
            }
            LockMode::Shared => {
                self.store
                    .remove_shared_holder(handle.resource_key(), handle.owner_token())
                    .await?
            }
        };

        if released {
            debug!(resource = handle.resource_key(), mode = ?handle.mode(), "Lease released");
        } else {
            warn!(
                resource = handle.resource_key(),
                mode = ?handle.mode(),
                "Lease no longer owned at release, left untouched"
            );
        }
        Ok(released)
    }

    /// Push the expiry of an exclusive lease to `now + new_lease`, only while still owner.
    pub async fn extend(
        &self,
        handle: &mut LockHandle,
        new_lease: Duration,
    ) -> Result<bool, LockError> {
        validate(handle.resource_key(), new_lease)?;
        if handle.mode() == LockMode::Shared {
            return Err(LockError::InvalidParameters(
                "shared leases cannot be extended".to_string(),
            ));
        }

        let extended = self
            .store
            .compare_and_expire(handle.resource_key(), handle.owner_token().as_bytes(), new_lease)
            .await?;
        if extended {
            handle.renewed(new_lease);
        }
        Ok(extended)
    }

    /// Keep an exclusive lease alive in the background until the watchdog is stopped.
    pub fn watch(&self, handle: &LockHandle, lease: Duration) -> LeaseWatchdog {
        LeaseWatchdog::spawn(self.clone(), handle.clone(), lease)
    }
}

fn validate(resource_key: &str, lease: Duration) -> Result<(), LockError> {
    if resource_key.is_empty() {
        return Err(LockError::InvalidParameters(
            "resource key cannot be empty".to_string(),
        ));
    }
    if lease.is_zero() {
        return Err(LockError::InvalidParameters(
            "lease duration must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

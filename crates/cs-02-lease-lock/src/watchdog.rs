//! Lease watchdog
//!
//! Background renewal for critical sections that may outlive their lease.
//! Every `lease / 3` the watchdog extends the lease back to its full length
//! through the owner-checked `extend`. It exits on `stop()`, on drop, or as
//! soon as an extension reports that ownership is gone.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shared_store::KeyValueStore;

use crate::domain::LockHandle;
use crate::service::LeaseLock;

const MIN_RENEW_INTERVAL: Duration = Duration::from_millis(1);

/// How a watchdog task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogExit {
    /// Stopped by its owner; the lease was held throughout.
    Stopped { renewals: u32 },
    /// An extension found the lease owned by someone else (or nobody).
    LeaseLost { renewals: u32 },
    /// The renewal task panicked or was aborted.
    Aborted,
}

/// Handle to a running renewal task
pub struct LeaseWatchdog {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<WatchdogExit>>,
    lost: Arc<AtomicBool>,
    renewals: Arc<AtomicU32>,
}

impl LeaseWatchdog {
    pub(crate) fn spawn<S: KeyValueStore + 'static>(
        lock: LeaseLock<S>,
        mut handle: LockHandle,
        lease: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let lost = Arc::new(AtomicBool::new(false));
        let renewals = Arc::new(AtomicU32::new(0));
        let interval = (lease / 3).max(MIN_RENEW_INTERVAL);

        let task = {
            let lost = lost.clone();
            let renewals = renewals.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => {
                            return WatchdogExit::Stopped {
                                renewals: renewals.load(Ordering::Relaxed),
                            };
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }

                    match lock.extend(&mut handle, lease).await {
                        Ok(true) => {
                            renewals.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {
                            lost.store(true, Ordering::SeqCst);
                            warn!(resource = handle.resource_key(), "Watchdog lost the lease");
                            return WatchdogExit::LeaseLost {
                                renewals: renewals.load(Ordering::Relaxed),
                            };
                        }
                        Err(e) => {
                            // Try again next tick; the lease is still bounded by its TTL.
                            warn!(
                                resource = handle.resource_key(),
                                error = %e,
                                "Lease renewal failed"
                            );
                        }
                    }
                }
            })
        };

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
            lost,
            renewals,
        }
    }

    /// Whether an extension has already found the lease gone.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Successful renewals so far.
    pub fn renewals(&self) -> u32 {
        self.renewals.load(Ordering::Relaxed)
    }

    /// Stop renewing and wait for the task to finish.
    pub async fn stop(mut self) -> WatchdogExit {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        let exit = match self.task.take() {
            Some(task) => task.await.unwrap_or(WatchdogExit::Aborted),
            None => WatchdogExit::Aborted,
        };
        debug!(?exit, "Lease watchdog stopped");
        exit
    }
}

impl Drop for LeaseWatchdog {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

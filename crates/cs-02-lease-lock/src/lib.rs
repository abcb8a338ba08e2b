//! # CS-02 Lease Lock
//!
//! Distributed mutual exclusion over the shared store. A lock record is
//! `resource_key → owner_token` with a store-enforced expiry (the lease).
//!
//! ## Guarantees
//!
//! - At most one exclusive holder per resource key while its lease runs.
//! - A holder never deletes or extends a record it does not still own:
//!   both go through atomic compare-on-token store operations.
//! - A crashed holder blocks others for at most one lease.
//!
//! Lease expiry ends mutual exclusion even if the critical section is still
//! running. Pick a lease longer than the critical section or run a
//! [`LeaseWatchdog`] beside it.
//!
//! ## Rejected designs
//!
//! - Set-if-absent without expiry: a holder that dies before its delete
//!   leaves the resource locked forever.
//! - Set-with-expiry plus unconditional delete: when the critical section
//!   outlives the lease, the late delete removes the next owner's record.
//!
//! ## Shared / exclusive
//!
//! `try_acquire_shared` admits any number of concurrent shared holders;
//! `try_acquire_exclusive` excludes shared and exclusive holders alike.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod service;
pub mod watchdog;

pub use domain::{BackoffPolicy, LockHandle, LockMode};
pub use error::LockError;
pub use service::LeaseLock;
pub use watchdog::{LeaseWatchdog, WatchdogExit};

//! Error types for the lease lock subsystem

use shared_store::StoreError;
use thiserror::Error;

/// Errors that can occur while acquiring, extending or releasing a lease.
///
/// Contention is not an error: a refused acquisition is reported as `None`.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Invalid lock parameters: {0}")]
    InvalidParameters(String),

    #[error("Shared store error: {0}")]
    Store(#[from] StoreError),
}

//! Error types for the stampede guard subsystem

use std::time::Duration;

use cs_01_membership_filter::FilterError;
use cs_02_lease_lock::LockError;
use shared_store::StoreError;
use thiserror::Error;

/// Errors from the authoritative source collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Authoritative source unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),
}

/// Errors surfaced by `StampedeGuard::resolve`
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Shared store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Recompute lock for '{key}' is held elsewhere, retry shortly")]
    LockContended { key: String },

    #[error("Authoritative lookup failed: {0}")]
    AuthoritativeLookupFailed(#[from] SourceError),

    #[error("Authoritative lookup exceeded {timeout:?}")]
    LoadTimedOut { timeout: Duration },

    #[error("Cache entry encoding error: {0}")]
    Encoding(String),
}

impl GuardError {
    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuardError::StoreUnavailable(StoreError::Unavailable(_))
                | GuardError::LockContended { .. }
                | GuardError::LoadTimedOut { .. }
                | GuardError::AuthoritativeLookupFailed(SourceError::Unavailable(_))
        )
    }
}

impl From<FilterError> for GuardError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Store(e) => GuardError::StoreUnavailable(e),
            other => GuardError::InvalidParameters(other.to_string()),
        }
    }
}

impl From<LockError> for GuardError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Store(e) => GuardError::StoreUnavailable(e),
            LockError::InvalidParameters(msg) => GuardError::InvalidParameters(msg),
        }
    }
}

//! Error types for the membership filter subsystem

use shared_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the membership filter subsystem
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {fpr} (must be strictly between 0 and 1)")]
    InvalidFpr { fpr: f64 },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Shared store error: {0}")]
    Store(#[from] StoreError),
}

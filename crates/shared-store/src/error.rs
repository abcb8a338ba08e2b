//! Error types for the shared store

use thiserror::Error;

/// Errors surfaced by a [`crate::KeyValueStore`] implementation.
///
/// All of these are transport-level failures from the caller's point of
/// view. Nothing in Cache-Shield retries them internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Operation against a key holding the wrong kind of value: {key}")]
    WrongType { key: String },

    #[error("Invalid store argument: {0}")]
    InvalidArgument(String),
}

//! Domain Layer - lock handles, owner tokens, backoff schedule
//!
//! RULES:
//! - No I/O operations
//! - No async code outside tests

pub mod backoff;
pub mod handle;

pub use backoff::{Backoff, BackoffPolicy};
pub use handle::{new_owner_token, LockHandle, LockMode};

//! Inbound Ports (Driving Ports)
//!
//! The API callers (the stampede guard, bootstrap jobs) use to interact
//! with a membership filter.

use async_trait::async_trait;

use crate::domain::{FilterHandle, FilterParameters};
use crate::error::FilterError;

/// Primary membership filter API (Driving Port)
#[async_trait]
pub trait MembershipFilterApi: Send + Sync {
    /// Parameters this filter was constructed with
    fn parameters(&self) -> &FilterParameters;

    /// Set every bit of `key` in the array named by `handle`.
    ///
    /// Idempotent. One store round-trip regardless of the hash round count.
    async fn add(&self, handle: &FilterHandle, key: &str) -> Result<(), FilterError>;

    /// Add many keys in one store round-trip.
    ///
    /// Returns the number of keys added.
    async fn add_all(&self, handle: &FilterHandle, keys: &[String]) -> Result<usize, FilterError>;

    /// Whether `key` may have been added.
    ///
    /// `false` means definitely absent. `true` may be a false positive.
    async fn might_contain(&self, handle: &FilterHandle, key: &str) -> Result<bool, FilterError>;

    /// Drop the backing bit array.
    async fn clear(&self, handle: &FilterHandle) -> Result<(), FilterError>;
}

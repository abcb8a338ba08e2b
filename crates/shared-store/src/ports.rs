//! Shared store port
//!
//! The driven port every Cache-Shield subsystem depends on. Adapters for a
//! real networked store implement this trait; [`crate::InMemoryStore`] is
//! the single-process implementation used for tests and embedded setups.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// Shared key-value store (Driven Port)
///
/// Each method is one network round-trip. Batched methods (`set_bits`,
/// `get_bits`) carry any number of positions in that single round-trip.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set every listed bit of the bit array `array` to 1.
    ///
    /// Returns the previous value of each bit, in input order. Missing arrays
    /// are created and grown on demand.
    async fn set_bits(&self, array: &str, positions: &[u64]) -> Result<Vec<bool>, StoreError>;

    /// Read every listed bit of the bit array `array`.
    ///
    /// Bits beyond the current array length (or of a missing array) read as 0.
    async fn get_bits(&self, array: &str, positions: &[u64]) -> Result<Vec<bool>, StoreError>;

    /// Atomically store `value` under `key` with an expiry, only if `key` is absent.
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Atomically delete `key` only if its current value equals `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, StoreError>;

    /// Atomically reset the expiry of `key` only if its current value equals `expected`.
    async fn compare_and_expire(
        &self,
        key: &str,
        expected: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Read a plain value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Unconditionally store a plain value with an expiry.
    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration)
        -> Result<(), StoreError>;

    /// Unconditionally delete `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically register `holder` as a shared holder of `key`.
    ///
    /// Fails (returns `false`) while `key` holds a plain value, i.e. while an
    /// exclusive owner exists. Each holder carries its own expiry.
    async fn add_shared_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Atomically remove `holder` from the shared holders of `key`.
    ///
    /// The key disappears with its last holder.
    async fn remove_shared_holder(&self, key: &str, holder: &str) -> Result<bool, StoreError>;
}

//! Membership Filter Service
//!
//! A Bloom filter whose bit array lives in the shared store. Parameters are
//! owned by the instance, so several independently sized filters can share
//! one process and one store.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{BitIndexer, FilterHandle, FilterParameters};
use crate::error::FilterError;
use crate::metrics::FilterMetrics;
use crate::ports::{KeyValueStore, MembershipFilterApi};

/// Store-backed Bloom filter
///
/// Implements the `MembershipFilterApi` port using an injected store.
pub struct MembershipFilter<S: KeyValueStore> {
    store: Arc<S>,
    indexer: BitIndexer,
    metrics: Arc<FilterMetrics>,
}

impl<S: KeyValueStore> MembershipFilter<S> {
    pub fn new(store: Arc<S>, params: FilterParameters) -> Self {
        Self::with_metrics(store, params, Arc::new(FilterMetrics::new()))
    }

    pub fn with_metrics(
        store: Arc<S>,
        params: FilterParameters,
        metrics: Arc<FilterMetrics>,
    ) -> Self {
        debug!(
            bit_array_size = params.bit_array_size(),
            hash_function_count = params.hash_function_count(),
            expected_insertions = params.expected_insertions(),
            "Membership filter constructed"
        );
        Self {
            store,
            indexer: BitIndexer::new(params),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<FilterMetrics> {
        &self.metrics
    }

    fn checked_positions(&self, key: &str) -> Result<Vec<u64>, FilterError> {
        if key.is_empty() {
            return Err(FilterError::InvalidParameters(
                "candidate key cannot be empty".to_string(),
            ));
        }
        Ok(self.indexer.positions(key))
    }

    async fn set_positions(
        &self,
        handle: &FilterHandle,
        positions: &[u64],
    ) -> Result<usize, FilterError> {
        let previous = self
            .store
            .set_bits(handle.name(), positions)
            .await
            .map_err(|e| {
                self.metrics.record_store_failure();
                warn!(filter = %handle, error = %e, "Bit write pipeline failed");
                e
            })?;
        Ok(previous.iter().filter(|was_set| !**was_set).count())
    }
}

#[async_trait]
impl<S: KeyValueStore + 'static> MembershipFilterApi for MembershipFilter<S> {
    fn parameters(&self) -> &FilterParameters {
        self.indexer.params()
    }

    async fn add(&self, handle: &FilterHandle, key: &str) -> Result<(), FilterError> {
        let positions = self.checked_positions(key)?;
        let fresh_bits = self.set_positions(handle, &positions).await?;

        self.metrics.record_add(1, fresh_bits);
        debug!(filter = %handle, key, fresh_bits, "Key added to filter");
        Ok(())
    }

    async fn add_all(&self, handle: &FilterHandle, keys: &[String]) -> Result<usize, FilterError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let per_key = self.parameters().hash_function_count() as usize;
        let mut positions = Vec::with_capacity(keys.len() * per_key);
        for key in keys {
            positions.extend(self.checked_positions(key)?);
        }
        let fresh_bits = self.set_positions(handle, &positions).await?;

        self.metrics.record_add(keys.len(), fresh_bits);
        debug!(filter = %handle, keys = keys.len(), fresh_bits, "Filter seeded");
        Ok(keys.len())
    }

    async fn might_contain(&self, handle: &FilterHandle, key: &str) -> Result<bool, FilterError> {
        let positions = self.checked_positions(key)?;
        let bits = self
            .store
            .get_bits(handle.name(), &positions)
            .await
            .map_err(|e| {
                self.metrics.record_store_failure();
                warn!(filter = %handle, error = %e, "Bit read pipeline failed");
                e
            })?;

        let found = bits.iter().all(|bit| *bit);
        self.metrics.record_lookup(found);
        Ok(found)
    }

    async fn clear(&self, handle: &FilterHandle) -> Result<(), FilterError> {
        let removed = self.store.delete(handle.name()).await.map_err(|e| {
            self.metrics.record_store_failure();
            warn!(filter = %handle, error = %e, "Bit array delete failed");
            e
        })?;
        debug!(filter = %handle, removed, "Filter bit array cleared");
        Ok(())
    }
}

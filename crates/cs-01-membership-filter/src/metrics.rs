//! Metrics hooks for membership filter operations
//!
//! Thread-safe counters shared between a filter and whoever reports on it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for filter operations
#[derive(Default)]
pub struct FilterMetrics {
    /// Keys added (single and bulk)
    pub keys_added: AtomicU64,
    /// Bits that flipped from 0 to 1 on add
    pub bits_set: AtomicU64,
    /// Total lookups performed
    pub lookups_performed: AtomicU64,
    /// Lookups answering "might contain"
    pub lookups_positive: AtomicU64,
    /// Store calls that failed
    pub store_failures: AtomicU64,
}

impl FilterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_add(&self, keys: usize, fresh_bits: usize) {
        self.keys_added.fetch_add(keys as u64, Ordering::Relaxed);
        self.bits_set.fetch_add(fresh_bits as u64, Ordering::Relaxed);
    }

    pub fn record_lookup(&self, found: bool) {
        self.lookups_performed.fetch_add(1, Ordering::Relaxed);
        if found {
            self.lookups_positive.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FilterMetricsSnapshot {
        FilterMetricsSnapshot {
            keys_added: self.keys_added.load(Ordering::Relaxed),
            bits_set: self.bits_set.load(Ordering::Relaxed),
            lookups_performed: self.lookups_performed.load(Ordering::Relaxed),
            lookups_positive: self.lookups_positive.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    /// Ratio of positive lookups to total lookups.
    ///
    /// Includes true positives, so it only approximates the false positive
    /// rate when probing keys known to be absent.
    pub fn observed_positive_rate(&self) -> f64 {
        let total = self.lookups_performed.load(Ordering::Relaxed);
        let positive = self.lookups_positive.load(Ordering::Relaxed);
        if total > 0 {
            positive as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.keys_added.store(0, Ordering::Relaxed);
        self.bits_set.store(0, Ordering::Relaxed);
        self.lookups_performed.store(0, Ordering::Relaxed);
        self.lookups_positive.store(0, Ordering::Relaxed);
        self.store_failures.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterMetricsSnapshot {
    pub keys_added: u64,
    pub bits_set: u64,
    pub lookups_performed: u64,
    pub lookups_positive: u64,
    pub store_failures: u64,
}

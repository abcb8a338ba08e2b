//! Metrics hooks for stampede guard resolutions

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ResolutionSource;

/// Counters per resolution outcome
#[derive(Default)]
pub struct GuardMetrics {
    pub filtered_absent: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub absent_cached: AtomicU64,
    /// Resolves refused because the recompute lock stayed taken
    pub contended: AtomicU64,
    /// Authoritative lookups started
    pub loads: AtomicU64,
    pub load_failures: AtomicU64,
    pub load_timeouts: AtomicU64,
}

impl GuardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_resolution(&self, source: ResolutionSource) {
        let counter = match source {
            ResolutionSource::FilteredAbsent => &self.filtered_absent,
            ResolutionSource::CacheHit => &self.cache_hits,
            ResolutionSource::CacheMiss => &self.cache_misses,
            ResolutionSource::AbsentCached => &self.absent_cached,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_contended(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_timeout(&self) {
        self.load_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GuardMetricsSnapshot {
        GuardMetricsSnapshot {
            filtered_absent: self.filtered_absent.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            absent_cached: self.absent_cached.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            load_timeouts: self.load_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardMetricsSnapshot {
    pub filtered_absent: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub absent_cached: u64,
    pub contended: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub load_timeouts: u64,
}

impl GuardMetricsSnapshot {
    /// Resolutions that completed with an answer.
    pub fn resolutions(&self) -> u64 {
        self.filtered_absent + self.cache_hits + self.cache_misses + self.absent_cached
    }

    /// Fraction of completed resolutions answered without the authoritative source.
    pub fn shielded_ratio(&self) -> f64 {
        let total = self.resolutions();
        if total == 0 {
            return 0.0;
        }
        (self.filtered_absent + self.cache_hits) as f64 / total as f64
    }
}

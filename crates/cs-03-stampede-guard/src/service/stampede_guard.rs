//! Stampede Guard Service
//!
//! Read path for one key:
//!
//! 1. Membership filter (optional): a negative answer ends the call.
//! 2. Cache read: a value or an absence marker ends the call.
//! 3. Per-key lease lock: losers fail fast or wait, per `ContentionPolicy`.
//! 4. Cache read again under the lock; an earlier holder may have filled it.
//! 5. Authoritative lookup, then cache the value (presence TTL) or the
//!    absence marker (absence TTL).
//! 6. Release the lock on every path, including errors and cancellation.
//!
//! Failed or timed-out lookups are never cached.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use cs_01_membership_filter::FilterHandle;
use cs_02_lease_lock::{LeaseLock, LeaseWatchdog, LockHandle, WatchdogExit};

use crate::domain::{CachedValue, ContentionPolicy, GuardConfig, Resolution, ResolutionSource};
use crate::error::GuardError;
use crate::metrics::GuardMetrics;
use crate::ports::{AuthoritativeSource, KeyValueStore, MembershipFilterApi};

/// Outcome of competing for the recompute lock
enum Contention {
    Acquired(LockHandle),
    /// Another holder filled the cache while we waited.
    Filled(CachedValue),
}

/// Cache-aside reads shielded from penetration and stampedes
pub struct StampedeGuard<S: KeyValueStore + 'static> {
    store: Arc<S>,
    lock: LeaseLock<S>,
    filter: Option<(Arc<dyn MembershipFilterApi>, FilterHandle)>,
    config: GuardConfig,
    metrics: Arc<GuardMetrics>,
}

impl<S: KeyValueStore + 'static> StampedeGuard<S> {
    pub fn new(store: Arc<S>, config: GuardConfig) -> Result<Self, GuardError> {
        config.validate()?;
        Ok(Self {
            lock: LeaseLock::new(store.clone()),
            store,
            filter: None,
            config,
            metrics: Arc::new(GuardMetrics::new()),
        })
    }

    /// Consult `filter` before anything else; keys it rules out never reach the cache.
    pub fn with_filter(
        mut self,
        filter: Arc<dyn MembershipFilterApi>,
        handle: FilterHandle,
    ) -> Self {
        self.filter = Some((filter, handle));
        self
    }

    /// Replace the recompute lock, e.g. to use a different backoff policy.
    pub fn with_lock(mut self, lock: LeaseLock<S>) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<GuardMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<GuardMetrics> {
        &self.metrics
    }

    pub fn cache_key(&self, key: &str) -> String {
        format!("{}{}", self.config.cache_prefix, key)
    }

    pub fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.config.lock_prefix, key)
    }

    /// Resolve `key` through filter, cache and lock, calling `source` at most once.
    #[instrument(skip(self, source), fields(key = %key))]
    pub async fn resolve<L>(&self, key: &str, source: &L) -> Result<Resolution, GuardError>
    where
        L: AuthoritativeSource + ?Sized,
    {
        if key.is_empty() {
            return Err(GuardError::InvalidParameters("key cannot be empty".to_string()));
        }

        if let Some((filter, handle)) = &self.filter {
            if !filter.might_contain(handle, key).await? {
                debug!(filter = %handle, "Key ruled out by membership filter");
                return Ok(self.finish(None, ResolutionSource::FilteredAbsent));
            }
        }

        let cache_key = self.cache_key(key);
        if let Some(cached) = self.read_cache(&cache_key).await? {
            return Ok(self.finish(cached.into_value(), ResolutionSource::CacheHit));
        }

        let handle = match self.compete(key, &cache_key).await? {
            Contention::Acquired(handle) => handle,
            Contention::Filled(cached) => {
                return Ok(self.finish(cached.into_value(), ResolutionSource::CacheHit));
            }
        };

        let watchdog = self
            .config
            .renew_lease
            .then(|| self.lock.watch(&handle, self.config.lock_lease));
        let held = HeldLease {
            lock: self.lock.clone(),
            handle: Some(handle),
            watchdog,
        };

        let outcome = self.recompute(key, &cache_key, source).await;
        held.release().await;

        let resolution = outcome?;
        self.metrics.record_resolution(resolution.source);
        Ok(resolution)
    }

    /// Drop the cached entry for `key` so the next resolve reloads it.
    pub async fn invalidate(&self, key: &str) -> Result<bool, GuardError> {
        let removed = self.store.delete(&self.cache_key(key)).await?;
        debug!(key, removed, "Cache entry invalidated");
        Ok(removed)
    }

    fn finish(&self, value: Option<Vec<u8>>, source: ResolutionSource) -> Resolution {
        self.metrics.record_resolution(source);
        debug!(?source, found = value.is_some(), "Resolved");
        Resolution::new(value, source)
    }

    async fn read_cache(&self, cache_key: &str) -> Result<Option<CachedValue>, GuardError> {
        match self.store.get(cache_key).await? {
            Some(bytes) => Ok(Some(CachedValue::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_cache(
        &self,
        cache_key: &str,
        entry: &CachedValue,
        ttl: Duration,
    ) -> Result<(), GuardError> {
        let bytes = entry.encode()?;
        self.store.set_with_expiry(cache_key, &bytes, ttl).await?;
        Ok(())
    }

    async fn compete(&self, key: &str, cache_key: &str) -> Result<Contention, GuardError> {
        let lock_key = self.lock_key(key);
        let lease = self.config.lock_lease;

        if let Some(handle) = self.lock.try_acquire(&lock_key, lease).await? {
            return Ok(Contention::Acquired(handle));
        }

        let max_wait = match self.config.contention {
            ContentionPolicy::FailFast => return Err(self.contended(key)),
            ContentionPolicy::Wait { max_wait } => max_wait,
        };

        let give_up_at = Instant::now() + max_wait;
        let mut backoff = self.lock.backoff().schedule();
        loop {
            let now = Instant::now();
            if now >= give_up_at {
                return Err(self.contended(key));
            }
            tokio::time::sleep(backoff.next_delay().min(give_up_at - now)).await;

            if let Some(cached) = self.read_cache(cache_key).await? {
                return Ok(Contention::Filled(cached));
            }
            if let Some(handle) = self.lock.try_acquire(&lock_key, lease).await? {
                return Ok(Contention::Acquired(handle));
            }
        }
    }

    fn contended(&self, key: &str) -> GuardError {
        self.metrics.record_contended();
        debug!("Recompute lock held elsewhere");
        GuardError::LockContended { key: key.to_string() }
    }

    async fn recompute<L>(
        &self,
        key: &str,
        cache_key: &str,
        source: &L,
    ) -> Result<Resolution, GuardError>
    where
        L: AuthoritativeSource + ?Sized,
    {
        if let Some(cached) = self.read_cache(cache_key).await? {
            debug!("Cache filled by previous lock holder");
            return Ok(Resolution::new(cached.into_value(), ResolutionSource::CacheHit));
        }

        match self.load(key, source).await? {
            Some(value) => {
                let entry = CachedValue::Present(value);
                self.write_cache(cache_key, &entry, self.config.presence_ttl).await?;
                Ok(Resolution::new(entry.into_value(), ResolutionSource::CacheMiss))
            }
            None => {
                self.write_cache(cache_key, &CachedValue::Absent, self.config.absence_ttl)
                    .await?;
                Ok(Resolution::new(None, ResolutionSource::AbsentCached))
            }
        }
    }

    async fn load<L>(&self, key: &str, source: &L) -> Result<Option<Vec<u8>>, GuardError>
    where
        L: AuthoritativeSource + ?Sized,
    {
        self.metrics.record_load();
        let lookup = source.lookup(key);

        let result = match self.config.load_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, lookup).await {
                Ok(result) => result,
                Err(_) => {
                    self.metrics.record_load_timeout();
                    warn!(?timeout, "Authoritative lookup timed out");
                    return Err(GuardError::LoadTimedOut { timeout });
                }
            },
            None => lookup.await,
        };

        result.map_err(|e| {
            self.metrics.record_load_failure();
            warn!(error = %e, "Authoritative lookup failed");
            GuardError::from(e)
        })
    }
}

/// A recompute lease that is released on every exit path.
///
/// `release` is the normal path. If the owning future is dropped first, the
/// release is handed to the runtime instead.
struct HeldLease<S: KeyValueStore + 'static> {
    lock: LeaseLock<S>,
    handle: Option<LockHandle>,
    watchdog: Option<LeaseWatchdog>,
}

impl<S: KeyValueStore + 'static> HeldLease<S> {
    async fn release(mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            if let WatchdogExit::LeaseLost { renewals } = watchdog.stop().await {
                warn!(renewals, "Recompute lease was lost while loading");
            }
        }

        if let Some(handle) = self.handle.take() {
            // A failed release leaves the lease to expire on its own.
            if let Err(e) = self.lock.release(&handle).await {
                warn!(
                    resource = handle.resource_key(),
                    error = %e,
                    "Recompute lock release failed"
                );
            }
        }
    }
}

impl<S: KeyValueStore + 'static> Drop for HeldLease<S> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let lock = self.lock.clone();
            runtime.spawn(async move {
                let _ = lock.release(&handle).await;
            });
        }
    }
}

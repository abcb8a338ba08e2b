//! # Stampede Guard Flows
//!
//! End-to-end read paths through filter, cache, lock and source:
//!
//! 1. **Single load**: 50 concurrent misses on one key, one authoritative lookup
//! 2. **Lease too short**: a load outliving its lease lets a second load in
//! 3. **Absence caching**: a missing key is remembered for the absence TTL
//! 4. **Filtered short-circuit**: ruled-out keys touch nothing but the filter
//! 5. **Failures**: failed and timed-out loads are never cached

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cs_01_membership_filter::{FilterHandle, FilterParameters, MembershipFilterApi};
    use cs_03_stampede_guard::{
        CachedValue, GuardConfig, GuardConfigBuilder, GuardError, Resolution, ResolutionSource,
        SourceError, StampedeGuard,
    };
    use shared_store::{InMemoryStore, KeyValueStore};

    use crate::fixtures::{init_logging, CountingFilter, CountingSource};

    const LOAD_TIME: Duration = Duration::from_millis(200);

    fn guard(config: GuardConfig) -> (Arc<InMemoryStore>, Arc<StampedeGuard<InMemoryStore>>) {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        let guard = StampedeGuard::new(store.clone(), config).unwrap();
        (store, Arc::new(guard))
    }

    async fn resolve_concurrently(
        guard: &Arc<StampedeGuard<InMemoryStore>>,
        source: &Arc<CountingSource>,
        key: &str,
        callers: usize,
    ) -> Vec<Result<Resolution, GuardError>> {
        let tasks: Vec<_> = (0..callers)
            .map(|_| {
                let guard = guard.clone();
                let source = source.clone();
                let key = key.to_string();
                tokio::spawn(async move { guard.resolve(&key, source.as_ref()).await })
            })
            .collect();

        futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("resolve task panicked"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_single_load() {
        let config = GuardConfigBuilder::new()
            .lock_lease(Duration::from_secs(10))
            .wait_for_lock(Duration::from_secs(5))
            .build()
            .unwrap();
        let (store, guard) = guard(config);
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let results = resolve_concurrently(&guard, &source, "42", 50).await;

        assert_eq!(source.calls(), 1);
        for result in results {
            let resolution = result.unwrap();
            assert_eq!(resolution.value.as_deref(), Some(&b"user-42"[..]));
        }

        let snapshot = guard.metrics().snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 49);
        assert!(!store.contains_key("lock:42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_fail_fast() {
        let (_, guard) = guard(GuardConfig::default());
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let results = resolve_concurrently(&guard, &source, "42", 50).await;

        assert_eq!(source.calls(), 1);
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        let contended = results
            .iter()
            .filter(|r| matches!(r, Err(GuardError::LockContended { .. })))
            .count();
        assert_eq!(loaded, 1);
        assert_eq!(contended, 49);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(GuardError::is_retryable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lease_admits_overlapping_load() {
        let config = GuardConfigBuilder::new()
            .lock_lease(Duration::from_millis(50))
            .build()
            .unwrap();
        let (store, guard) = guard(config);
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let first = {
            let guard = guard.clone();
            let source = source.clone();
            tokio::spawn(async move { guard.resolve("42", source.as_ref()).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = guard.resolve("42", source.as_ref()).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.source, ResolutionSource::CacheMiss);
        assert_eq!(second.source, ResolutionSource::CacheMiss);
        assert_eq!(source.calls(), 2);
        assert!(!store.contains_key("lock:42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_lease_refuses_overlapping_load() {
        let (_, guard) = guard(GuardConfig::default());
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let first = {
            let guard = guard.clone();
            let source = source.clone();
            tokio::spawn(async move { guard.resolve("42", source.as_ref()).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = guard.resolve("42", source.as_ref()).await;
        assert!(matches!(second, Err(GuardError::LockContended { .. })));

        first.await.unwrap().unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lease_many_waiters_bounded_loads() {
        let config = GuardConfigBuilder::new()
            .lock_lease(Duration::from_millis(50))
            .wait_for_lock(Duration::from_secs(5))
            .build()
            .unwrap();
        let (store, guard) = guard(config);
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let results = resolve_concurrently(&guard, &source, "42", 50).await;

        assert!(results.iter().all(|r| r.is_ok()));
        // One new holder per expired lease until the first load fills the cache
        assert!(source.calls() <= 5, "{} loads", source.calls());
        assert!(!store.contains_key("lock:42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absence_round_trip() {
        let (store, guard) = guard(GuardConfig::default());
        let source = CountingSource::users(100);

        let first = guard.resolve("9999", &source).await.unwrap();
        assert_eq!(first.source, ResolutionSource::AbsentCached);
        assert_eq!(first.value, None);

        let marker = store.get("cache:9999").await.unwrap().unwrap();
        assert_eq!(CachedValue::decode(&marker).unwrap(), CachedValue::Absent);

        let second = guard.resolve("9999", &source).await.unwrap();
        assert_eq!(second.source, ResolutionSource::CacheHit);
        assert_eq!(second.value, None);
        assert_eq!(source.calls(), 1);

        // The row appears later; the absence is forgotten after its TTL
        source.insert("9999", b"user-9999");
        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(guard.resolve("9999", &source).await.unwrap().value, None);

        tokio::time::advance(Duration::from_secs(2)).await;
        let third = guard.resolve("9999", &source).await.unwrap();
        assert_eq!(third.source, ResolutionSource::CacheMiss);
        assert_eq!(third.value.as_deref(), Some(&b"user-9999"[..]));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_filtered_short_circuit_touches_only_filter() {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        let filter = Arc::new(CountingFilter::new(
            store.clone(),
            FilterParameters::new(100, 0.01).unwrap(),
        ));
        let handle = FilterHandle::new("user:bloom").unwrap();
        let source = CountingSource::users(100);
        filter.add_all(&handle, &source.keys()).await.unwrap();
        store.reset_stats();

        let guard = StampedeGuard::new(store.clone(), GuardConfig::default())
            .unwrap()
            .with_filter(filter.clone(), handle);

        let result = guard.resolve("not-a-user", &source).await.unwrap();
        assert_eq!(result.source, ResolutionSource::FilteredAbsent);

        assert_eq!(filter.lookups(), 1);
        assert_eq!(source.calls(), 0);
        let stats = store.stats();
        assert_eq!(stats.bit_reads, 1);
        assert_eq!(stats.total(), 1);
    }

    #[tokio::test]
    async fn test_seeded_filter_lets_members_through() {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        let filter = Arc::new(CountingFilter::new(
            store.clone(),
            FilterParameters::new(100, 0.01).unwrap(),
        ));
        let handle = FilterHandle::new("user:bloom").unwrap();
        let source = CountingSource::users(100);
        filter.add_all(&handle, &source.keys()).await.unwrap();

        let guard = StampedeGuard::new(store, GuardConfig::default())
            .unwrap()
            .with_filter(filter.clone(), handle);

        for id in [1, 50, 100] {
            let resolution = guard.resolve(&id.to_string(), &source).await.unwrap();
            assert_eq!(resolution.source, ResolutionSource::CacheMiss);
            assert_eq!(resolution.into_value(), Some(format!("user-{}", id).into_bytes()));
        }
        assert_eq!(filter.lookups(), 3);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_load_not_cached_and_lock_released() {
        let (store, guard) = guard(GuardConfig::default());
        let source = CountingSource::users(100);
        source.fail_next(1);

        let failed = guard.resolve("42", &source).await;
        assert!(matches!(
            failed,
            Err(GuardError::AuthoritativeLookupFailed(SourceError::Unavailable(_)))
        ));
        assert!(!store.contains_key("cache:42"));
        assert!(!store.contains_key("lock:42"));

        let recovered = guard.resolve("42", &source).await.unwrap();
        assert_eq!(recovered.source, ResolutionSource::CacheMiss);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_load_not_cached() {
        let config = GuardConfigBuilder::new()
            .load_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let (store, guard) = guard(config);
        let source = CountingSource::users(100).slow(LOAD_TIME);

        let result = guard.resolve("42", &source).await;
        assert!(matches!(result, Err(GuardError::LoadTimedOut { .. })));
        assert!(!store.contains_key("cache:42"));
        assert!(!store.contains_key("lock:42"));

        let snapshot = guard.metrics().snapshot();
        assert_eq!(snapshot.loads, 1);
        assert_eq!(snapshot.load_timeouts, 1);
        assert_eq!(snapshot.resolutions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewed_lease_keeps_slow_load_exclusive() {
        let config = GuardConfigBuilder::new()
            .lock_lease(Duration::from_millis(50))
            .renew_lease(true)
            .build()
            .unwrap();
        let (_, guard) = guard(config);
        let source = Arc::new(CountingSource::users(100).slow(LOAD_TIME));

        let first = {
            let guard = guard.clone();
            let source = source.clone();
            tokio::spawn(async move { guard.resolve("42", source.as_ref()).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = guard.resolve("42", source.as_ref()).await;
        assert!(matches!(second, Err(GuardError::LockContended { .. })));

        assert_eq!(first.await.unwrap().unwrap().source, ResolutionSource::CacheMiss);
        assert_eq!(source.calls(), 1);
    }
}

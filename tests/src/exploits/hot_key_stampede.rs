//! # Hot Key Stampede
//!
//! A popular key expires while hundreds of requests are in flight. Without
//! a recompute lock every one of them would query the database.
//!
//! Expected: one authoritative load per expiry, everyone else served from
//! the refilled cache.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cs_03_stampede_guard::{GuardConfigBuilder, ResolutionSource, StampedeGuard};
    use shared_store::InMemoryStore;

    use crate::fixtures::{init_logging, CountingSource};

    const CALLERS: usize = 200;

    #[tokio::test(start_paused = true)]
    async fn test_one_load_per_expiry() {
        init_logging();
        let config = GuardConfigBuilder::new()
            .presence_ttl(Duration::from_secs(5))
            .wait_for_lock(Duration::from_secs(5))
            .build()
            .unwrap();
        let store = Arc::new(InMemoryStore::new());
        let guard = Arc::new(StampedeGuard::new(store, config).unwrap());
        let source = Arc::new(CountingSource::users(10).slow(Duration::from_millis(150)));

        for episode in 1..=3 {
            let tasks: Vec<_> = (0..CALLERS)
                .map(|_| {
                    let guard = guard.clone();
                    let source = source.clone();
                    tokio::spawn(async move { guard.resolve("7", source.as_ref()).await })
                })
                .collect();

            let mut misses = 0;
            for task in tasks {
                let resolution = task.await.unwrap().unwrap();
                assert_eq!(resolution.value.as_deref(), Some(&b"user-7"[..]));
                if resolution.source == ResolutionSource::CacheMiss {
                    misses += 1;
                }
            }

            assert_eq!(misses, 1);
            assert_eq!(source.calls(), episode);

            // Let the hot entry expire before the next wave
            tokio::time::sleep(Duration::from_secs(6)).await;
        }

        assert_eq!(guard.metrics().snapshot().loads, 3);
    }
}

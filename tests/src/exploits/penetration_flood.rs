//! # Penetration Flood
//!
//! An attacker requests thousands of ids that do not exist, hoping each one
//! falls through the cache to the database.
//!
//! Defenses exercised:
//! - The membership filter answers "absent" for all but its false positives.
//! - False positives that reach the database are cached as absences, so a
//!   replay of the same ids costs nothing.

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    use cs_01_membership_filter::{
    FilterHandle, FilterParameters, MembershipFilter, MembershipFilterApi,
};
    use cs_03_stampede_guard::{GuardConfig, StampedeGuard};
    use shared_store::InMemoryStore;

    use crate::fixtures::{init_logging, CountingSource};

    const FPR: f64 = 0.01;
    const ATTACK_SIZE: usize = 10_000;

    #[tokio::test]
    async fn test_flood_of_missing_ids_mostly_filtered() {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        let source = CountingSource::users(1_000);
        let filter = Arc::new(MembershipFilter::new(
            store.clone(),
            FilterParameters::new(1_000, FPR).unwrap(),
        ));
        let handle = FilterHandle::new("user:bloom").unwrap();
        filter.add_all(&handle, &source.keys()).await.unwrap();

        let guard = StampedeGuard::new(store.clone(), GuardConfig::default())
            .unwrap()
            .with_filter(filter, handle);

        let mut rng = StdRng::seed_from_u64(0xbad);
        let attack: Vec<String> = (0..ATTACK_SIZE)
            .map(|i| format!("attacker-{}-{:x}", i, rng.gen::<u64>()))
            .collect();

        for id in &attack {
            let resolution = guard.resolve(id, &source).await.unwrap();
            assert!(!resolution.found());
        }

        let reached_source = source.calls();
        assert!(
            (reached_source as f64) < 3.0 * FPR * ATTACK_SIZE as f64,
            "{} of {} lookups reached the source",
            reached_source,
            ATTACK_SIZE
        );

        let snapshot = guard.metrics().snapshot();
        assert_eq!(snapshot.absent_cached as usize, reached_source);
        assert_eq!(
            snapshot.filtered_absent as usize + reached_source,
            ATTACK_SIZE
        );

        // Replay: false positives now hit the cached absence
        for id in &attack {
            guard.resolve(id, &source).await.unwrap();
        }
        assert_eq!(source.calls(), reached_source);
    }

    #[tokio::test]
    async fn test_flood_without_filter_is_absorbed_by_absence_cache() {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        let source = CountingSource::users(10);
        let guard = StampedeGuard::new(store, GuardConfig::default()).unwrap();

        for _ in 0..100 {
            let resolution = guard.resolve("-1", &source).await.unwrap();
            assert!(!resolution.found());
        }

        assert_eq!(source.calls(), 1);
        let snapshot = guard.metrics().snapshot();
        assert_eq!(snapshot.absent_cached, 1);
        assert_eq!(snapshot.cache_hits, 99);
        assert_eq!(snapshot.resolutions(), 100);
        assert!(snapshot.shielded_ratio() > 0.98);
    }
}

//! # Lease Lock Properties
//!
//! 1. **Mutual exclusion**: no two holders inside a critical section at once
//! 2. **Safe release**: a late release never frees someone else's lease
//! 3. **Bounded abandonment**: a crashed holder blocks others for one lease
//! 4. **Shared / exclusive**: readers coexist, writers exclude everyone
//!
//! Also shows why release must compare the owner token: a plain delete
//! issued after expiry removes the next owner's record.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use cs_02_lease_lock::{LeaseLock, WatchdogExit};
    use shared_store::{InMemoryStore, KeyValueStore};

    use crate::fixtures::init_logging;

    const LEASE: Duration = Duration::from_secs(10);

    fn lock() -> (Arc<InMemoryStore>, LeaseLock<InMemoryStore>) {
        init_logging();
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), LeaseLock::new(store))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mutual_exclusion_under_contention() {
        let (_, lock) = lock();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..20)
            .map(|_| {
                let lock = lock.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                let completed = completed.clone();
                tokio::spawn(async move {
                    let handle = lock
                        .acquire_with_backoff("lock:counter", LEASE, Duration::from_secs(30))
                        .await
                        .unwrap()
                        .expect("lease within max_wait");

                    let now_inside = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now_inside, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);

                    assert!(lock.release(&handle).await.unwrap());
                    completed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for worker in workers {
            worker.await.unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_safe_release_after_expiry() {
        let (store, lock) = lock();
        let lease = Duration::from_millis(100);

        let first = lock.try_acquire("lock:42", lease).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_millis(150)).await;

        let second = lock.try_acquire("lock:42", LEASE).await.unwrap().unwrap();
        assert!(!lock.release(&first).await.unwrap());

        let stored = store.get("lock:42").await.unwrap().unwrap();
        assert_eq!(stored, second.owner_token().as_bytes());
        assert!(lock.try_acquire("lock:42", LEASE).await.unwrap().is_none());

        assert!(lock.release(&second).await.unwrap());
        assert!(lock.try_acquire("lock:42", LEASE).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconditional_delete_frees_new_owner() {
        let (store, lock) = lock();
        let lease = Duration::from_millis(100);

        lock.try_acquire("lock:42", lease).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_millis(150)).await;
        let _second = lock.try_acquire("lock:42", LEASE).await.unwrap().unwrap();

        // What a set-with-expiry + plain-delete lock would do on late release
        store.delete("lock:42").await.unwrap();

        // ...and a third caller now walks into the second owner's critical section
        assert!(lock.try_acquire("lock:42", LEASE).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lease_blocks_for_one_lease() {
        let (_, lock) = lock();
        let lease = Duration::from_secs(2);

        let crashed = lock.try_acquire("lock:42", lease).await.unwrap().unwrap();
        drop(crashed);

        tokio::time::advance(Duration::from_millis(1_900)).await;
        assert!(lock.try_acquire("lock:42", lease).await.unwrap().is_none());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(lock.try_acquire("lock:42", lease).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_holds_off_waiter_until_stopped() {
        let (_, lock) = lock();
        let lease = Duration::from_millis(300);

        let handle = lock.try_acquire("lock:report", lease).await.unwrap().unwrap();
        let watchdog = lock.watch(&handle, lease);

        let waiter = lock
            .acquire_with_backoff("lock:report", lease, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(waiter.is_none());

        assert!(matches!(watchdog.stop().await, WatchdogExit::Stopped { .. }));
        assert!(lock.release(&handle).await.unwrap());
        assert!(lock.try_acquire("lock:report", lease).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_readers_coexist_writer_excluded() {
        let (_, lock) = lock();

        let reader_a = lock.try_acquire_shared("lock:catalog", LEASE).await.unwrap().unwrap();
        let reader_b = lock.try_acquire_shared("lock:catalog", LEASE).await.unwrap().unwrap();
        assert_ne!(reader_a.owner_token(), reader_b.owner_token());
        assert!(lock.try_acquire_exclusive("lock:catalog", LEASE).await.unwrap().is_none());

        assert!(lock.release(&reader_a).await.unwrap());
        assert!(lock.try_acquire_exclusive("lock:catalog", LEASE).await.unwrap().is_none());

        assert!(lock.release(&reader_b).await.unwrap());
        let writer = lock.try_acquire_exclusive("lock:catalog", LEASE).await.unwrap().unwrap();
        assert!(lock.try_acquire_shared("lock:catalog", LEASE).await.unwrap().is_none());
        assert!(lock.release(&writer).await.unwrap());
    }
}

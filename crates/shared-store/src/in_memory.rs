//! # In-Memory Store
//!
//! Single-process implementation of [`KeyValueStore`]. Plain values and bit
//! arrays share one keyspace (bit arrays are byte strings addressed
//! most-significant-bit first, as networked stores lay them out).
//!
//! Expiry uses `tokio::time::Instant`, so tests running on a paused clock
//! can move leases and TTLs forward deterministically.

use async_trait::async_trait;
use bitvec::prelude::*;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::ports::KeyValueStore;

enum StoredValue {
    Bytes(Vec<u8>),
    /// Shared holders, each with its own deadline.
    Holders(HashMap<String, Instant>),
}

struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn bytes(value: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self {
            value: StoredValue::Bytes(value),
            expires_at,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }

    fn prune_holders(&mut self, now: Instant) {
        if let StoredValue::Holders(holders) = &mut self.value {
            holders.retain(|_, deadline| *deadline > now);
            self.expires_at = Some(holders.values().max().copied().unwrap_or(now));
        }
    }
}

/// Store operation kinds, for targeted failure injection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    SetBits,
    GetBits,
    SetIfAbsent,
    CompareAndDelete,
    CompareAndExpire,
    Get,
    SetWithExpiry,
    Delete,
    /// Both `add_shared_holder` and `remove_shared_holder`
    SharedHolder,
}

/// Per-operation call counters
#[derive(Default)]
struct CallCounters {
    bit_writes: AtomicU64,
    bit_reads: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    conditional_sets: AtomicU64,
    conditional_deletes: AtomicU64,
    conditional_expires: AtomicU64,
    deletes: AtomicU64,
    shared_holder_ops: AtomicU64,
}

/// Point-in-time snapshot of store round-trips, by operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCallStats {
    pub bit_writes: u64,
    pub bit_reads: u64,
    pub reads: u64,
    pub writes: u64,
    pub conditional_sets: u64,
    pub conditional_deletes: u64,
    pub conditional_expires: u64,
    pub deletes: u64,
    pub shared_holder_ops: u64,
}

impl StoreCallStats {
    /// Total round-trips of any kind
    pub fn total(&self) -> u64 {
        self.bit_writes
            + self.bit_reads
            + self.reads
            + self.writes
            + self.conditional_sets
            + self.conditional_deletes
            + self.conditional_expires
            + self.deletes
            + self.shared_holder_ops
    }

    /// Round-trips that touched plain (cache) values
    pub fn cache_calls(&self) -> u64 {
        self.reads + self.writes
    }
}

/// In-memory shared store.
///
/// Every trait method counts as one round-trip in [`StoreCallStats`], whether
/// or not it succeeds. [`InMemoryStore::set_available`] simulates an outage:
/// while unavailable every call fails with [`StoreError::Unavailable`].
/// [`InMemoryStore::fail_operation`] does the same for one kind of call.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    counters: CallCounters,
    available: AtomicBool,
    failing: Mutex<HashSet<StoreOp>>,
}

impl InMemoryStore {
    /// Create an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            counters: CallCounters::default(),
            available: AtomicBool::new(true),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Toggle simulated reachability.
    pub fn set_available(&self, available: bool) {
        debug!(available, "In-memory store availability changed");
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every call of kind `op` fail with [`StoreError::Unavailable`]
    /// (or succeed again when `failing` is false). Other calls are unaffected.
    pub fn fail_operation(&self, op: StoreOp, failing: bool) {
        debug!(?op, failing, "In-memory store operation failure toggled");
        let mut ops = self.failing.lock();
        if failing {
            ops.insert(op);
        } else {
            ops.remove(&op);
        }
    }

    /// Snapshot of round-trips issued so far.
    pub fn stats(&self) -> StoreCallStats {
        let c = &self.counters;
        StoreCallStats {
            bit_writes: c.bit_writes.load(Ordering::Relaxed),
            bit_reads: c.bit_reads.load(Ordering::Relaxed),
            reads: c.reads.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            conditional_sets: c.conditional_sets.load(Ordering::Relaxed),
            conditional_deletes: c.conditional_deletes.load(Ordering::Relaxed),
            conditional_expires: c.conditional_expires.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            shared_holder_ops: c.shared_holder_ops.load(Ordering::Relaxed),
        }
    }

    /// Reset all round-trip counters.
    pub fn reset_stats(&self) {
        let c = &self.counters;
        for counter in [
            &c.bit_writes,
            &c.bit_reads,
            &c.reads,
            &c.writes,
            &c.conditional_sets,
            &c.conditional_deletes,
            &c.conditional_expires,
            &c.deletes,
            &c.shared_holder_ops,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Whether `key` currently exists (expired keys do not). Not counted.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);
        entries.contains_key(key)
    }

    /// Remaining time to live of `key`, if it exists and has an expiry. Not counted.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);
        entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    fn counter(&self, op: StoreOp) -> &AtomicU64 {
        let c = &self.counters;
        match op {
            StoreOp::SetBits => &c.bit_writes,
            StoreOp::GetBits => &c.bit_reads,
            StoreOp::SetIfAbsent => &c.conditional_sets,
            StoreOp::CompareAndDelete => &c.conditional_deletes,
            StoreOp::CompareAndExpire => &c.conditional_expires,
            StoreOp::Get => &c.reads,
            StoreOp::SetWithExpiry => &c.writes,
            StoreOp::Delete => &c.deletes,
            StoreOp::SharedHolder => &c.shared_holder_ops,
        }
    }

    fn begin(&self, op: StoreOp) -> Result<(), StoreError> {
        self.counter(op).fetch_add(1, Ordering::Relaxed);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        if self.failing.lock().contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop `key` if it has expired, pruning stale shared holders first.
fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    let expired = entries.get_mut(key).map_or(false, |entry| {
        entry.prune_holders(now);
        !entry.is_live(now)
    });
    if expired {
        trace!(key, "Expired key evicted");
        entries.remove(key);
    }
}

fn validate_ttl(ttl: Duration) -> Result<(), StoreError> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidArgument(
            "expiry must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn bit_indexes(positions: &[u64]) -> Result<Vec<usize>, StoreError> {
    positions
        .iter()
        .map(|&pos| {
            usize::try_from(pos).map_err(|_| {
                StoreError::InvalidArgument(format!("bit offset {} out of range", pos))
            })
        })
        .collect()
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_bits(&self, array: &str, positions: &[u64]) -> Result<Vec<bool>, StoreError> {
        self.begin(StoreOp::SetBits)?;
        let indexes = bit_indexes(positions)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, array, now);

        let entry = entries
            .entry(array.to_string())
            .or_insert_with(|| Entry::bytes(Vec::new(), None));
        let bytes = match &mut entry.value {
            StoredValue::Bytes(bytes) => bytes,
            StoredValue::Holders(_) => {
                return Err(StoreError::WrongType {
                    key: array.to_string(),
                })
            }
        };

        if let Some(max) = indexes.iter().max() {
            let needed = max / 8 + 1;
            if bytes.len() < needed {
                bytes.resize(needed, 0);
            }
        }

        let bits = bytes.as_mut_slice().view_bits_mut::<Msb0>();
        let previous = indexes
            .iter()
            .map(|&index| {
                let was_set = bits[index];
                bits.set(index, true);
                was_set
            })
            .collect();
        Ok(previous)
    }

    async fn get_bits(&self, array: &str, positions: &[u64]) -> Result<Vec<bool>, StoreError> {
        self.begin(StoreOp::GetBits)?;
        let indexes = bit_indexes(positions)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, array, now);

        match entries.get(array).map(|entry| &entry.value) {
            None => Ok(vec![false; indexes.len()]),
            Some(StoredValue::Bytes(bytes)) => {
                let bits = bytes.as_slice().view_bits::<Msb0>();
                Ok(indexes
                    .iter()
                    .map(|&index| bits.get(index).map_or(false, |bit| *bit))
                    .collect())
            }
            Some(StoredValue::Holders(_)) => Err(StoreError::WrongType {
                key: array.to_string(),
            }),
        }
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.begin(StoreOp::SetIfAbsent)?;
        validate_ttl(ttl)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::bytes(value.to_vec(), Some(now + ttl)));
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, StoreError> {
        self.begin(StoreOp::CompareAndDelete)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        let matches = matches!(
            entries.get(key).map(|entry| &entry.value),
            Some(StoredValue::Bytes(current)) if current.as_slice() == expected
        );
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn compare_and_expire(
        &self,
        key: &str,
        expected: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.begin(StoreOp::CompareAndExpire)?;
        validate_ttl(ttl)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        match entries.get_mut(key) {
            Some(entry) => match &entry.value {
                StoredValue::Bytes(current) if current.as_slice() == expected => {
                    entry.expires_at = Some(now + ttl);
                    Ok(true)
                }
                _ => Ok(false),
            },
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.begin(StoreOp::Get)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        match entries.get(key).map(|entry| &entry.value) {
            None => Ok(None),
            Some(StoredValue::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(StoredValue::Holders(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.begin(StoreOp::SetWithExpiry)?;
        validate_ttl(ttl)?;
        let now = Instant::now();
        self.entries
            .lock()
            .insert(key.to_string(), Entry::bytes(value.to_vec(), Some(now + ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.begin(StoreOp::Delete)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);
        Ok(entries.remove(key).is_some())
    }

    async fn add_shared_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.begin(StoreOp::SharedHolder)?;
        validate_ttl(ttl)?;
        let now = Instant::now();
        let deadline = now + ttl;
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        match entries.get_mut(key) {
            None => {
                let holders = HashMap::from([(holder.to_string(), deadline)]);
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: StoredValue::Holders(holders),
                        expires_at: Some(deadline),
                    },
                );
                Ok(true)
            }
            Some(entry) => match &mut entry.value {
                StoredValue::Bytes(_) => Ok(false),
                StoredValue::Holders(holders) => {
                    holders.insert(holder.to_string(), deadline);
                    entry.expires_at = holders.values().max().copied();
                    Ok(true)
                }
            },
        }
    }

    async fn remove_shared_holder(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        self.begin(StoreOp::SharedHolder)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, now);

        let (removed, now_empty) = match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                StoredValue::Holders(holders) => {
                    let removed = holders.remove(holder).is_some();
                    entry.expires_at = holders.values().max().copied();
                    (removed, holders.is_empty())
                }
                StoredValue::Bytes(_) => (false, false),
            },
            None => (false, false),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }
}

//! Sharded invalidation-statistics table.
//!
//! ## Architecture
//! - One `FxHashMap<OwnedKey, KeyStats>` per shard, each behind its own
//!   `parking_lot::RwLock`.
//! - The shard index is a deterministic function of the key triple, so all
//!   operations on one key serialize behind a single lock; keys in other
//!   shards proceed in parallel.
//! - A relaxed `AtomicUsize` gauge tracks the live entry count across shards.
//!
//! ## Core Operations
//! - `on_miss`: record an invalidation for a key believed resident.
//! - `should_skip_insert`: the admission decision (pure read).
//! - `on_insert` / `on_evict`: residency bookkeeping.
//! - `clear`: drop every entry across all shards.
//!
//! ## Invariant
//! An entry exists iff its `cached_key_count >= 1`. The evict that drains the
//! count to zero removes the entry whole, discarding its invalidation
//! history. `check_invariants` verifies this plus the gauge.

use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ds::ShardSelector;
use crate::error::InvariantError;
use crate::key::{KeyCtx, OwnedKey};
use crate::metrics::AdmissionMetricsSnapshot;

/// Shard count used when no explicit count is configured.
pub const DEFAULT_SHARDS: usize = 64;

/// Per-key residency and invalidation counts.
///
/// `cached_key_count` counts co-existing physical copies of one logical key
/// (e.g. the same user key resident under different snapshots);
/// `invalidation_count` counts misses observed while at least one copy was
/// believed resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    pub cached_key_count: u32,
    pub invalidation_count: u32,
}

/// Hook counters, maintained with relaxed atomics.
#[derive(Debug, Default)]
struct HookCounters {
    invalidation_calls: AtomicU64,
    invalidations_recorded: AtomicU64,
    skip_checks: AtomicU64,
    skip_decisions: AtomicU64,
    insert_calls: AtomicU64,
    inserts_new: AtomicU64,
    insert_copies: AtomicU64,
    evict_calls: AtomicU64,
    evict_decrements: AtomicU64,
    entries_removed: AtomicU64,
}

impl HookCounters {
    #[inline]
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sharded concurrent map from key triple to [`KeyStats`].
///
/// Every operation copies the caller's triple into an [`OwnedKey`] before
/// touching the map, so the table never aliases caller memory. All
/// operations are total; reads on an absent key return 0.
///
/// # Example
///
/// ```
/// use admitkit::key::{DbId, KeyCtx};
/// use admitkit::table::stats::StatsTable;
///
/// let table = StatsTable::new(4, 0);
/// let db = DbId::issue();
/// let key = KeyCtx::new(db, 0, b"row:abc");
///
/// table.on_insert(&key);
/// assert!(table.on_miss(&key));
/// assert_eq!(table.invalidation_count(&key), 1);
/// assert!(table.should_skip_insert(&key, 1));
///
/// table.on_evict(&key);
/// assert_eq!(table.cached_key_count(&key), 0);
/// ```
#[derive(Debug)]
pub struct StatsTable {
    shards: Vec<RwLock<FxHashMap<OwnedKey, KeyStats>>>,
    selector: ShardSelector,
    tracked: AtomicUsize,
    counters: HookCounters,
}

impl StatsTable {
    /// Creates a table with `shards` independently locked shards.
    ///
    /// The shard count is clamped to at least 1.
    pub fn new(shards: usize, seed: u64) -> Self {
        let selector = ShardSelector::new(shards, seed);
        let mut shard_vec = Vec::with_capacity(selector.shard_count());
        for _ in 0..selector.shard_count() {
            shard_vec.push(RwLock::new(FxHashMap::default()));
        }
        Self {
            shards: shard_vec,
            selector,
            tracked: AtomicUsize::new(0),
            counters: HookCounters::default(),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, key: &KeyCtx<'_>) -> &RwLock<FxHashMap<OwnedKey, KeyStats>> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    /// Records a cache miss for `key`.
    ///
    /// A miss on a key the table believes resident signals an invalidation
    /// caused outside the policy's own evict hook (e.g. the underlying
    /// cache's independent eviction); this is the only way such
    /// invalidations become visible. Returns true iff an invalidation was
    /// recorded; a miss on an untracked key is a no-op.
    pub fn on_miss(&self, key: &KeyCtx<'_>) -> bool {
        HookCounters::inc(&self.counters.invalidation_calls);
        let mut map = self.shard_for(key).write();
        match map.get_mut(&key.to_owned_key()) {
            Some(stats) if stats.cached_key_count > 0 => {
                stats.invalidation_count = stats.invalidation_count.saturating_add(1);
                HookCounters::inc(&self.counters.invalidations_recorded);
                true
            },
            _ => false,
        }
    }

    /// The admission decision: true iff `key` is tracked and its
    /// invalidation count has reached `threshold`.
    ///
    /// A threshold of 0 skips any tracked key, even one with zero recorded
    /// invalidations; an untracked key is never skipped, threshold 0
    /// included. This boundary is intentional.
    pub fn should_skip_insert(&self, key: &KeyCtx<'_>, threshold: u32) -> bool {
        HookCounters::inc(&self.counters.skip_checks);
        let skip = {
            let map = self.shard_for(key).read();
            map.get(&key.to_owned_key())
                .is_some_and(|stats| stats.invalidation_count >= threshold)
        };
        if skip {
            HookCounters::inc(&self.counters.skip_decisions);
        }
        skip
    }

    /// Records another resident copy of `key`, creating its entry with
    /// `{cached_key_count: 1, invalidation_count: 0}` if absent.
    pub fn on_insert(&self, key: &KeyCtx<'_>) {
        HookCounters::inc(&self.counters.insert_calls);
        let mut map = self.shard_for(key).write();
        match map.entry(key.to_owned_key()) {
            Entry::Occupied(mut entry) => {
                let stats = entry.get_mut();
                stats.cached_key_count = stats.cached_key_count.saturating_add(1);
                HookCounters::inc(&self.counters.insert_copies);
            },
            Entry::Vacant(entry) => {
                entry.insert(KeyStats {
                    cached_key_count: 1,
                    invalidation_count: 0,
                });
                self.tracked.fetch_add(1, Ordering::Relaxed);
                HookCounters::inc(&self.counters.inserts_new);
            },
        }
    }

    /// Records the eviction of one resident copy of `key`.
    ///
    /// Removes the entry whole when the last copy goes, discarding its
    /// invalidation history. No-op for an untracked key.
    pub fn on_evict(&self, key: &KeyCtx<'_>) {
        HookCounters::inc(&self.counters.evict_calls);
        let mut map = self.shard_for(key).write();
        if let Entry::Occupied(mut entry) = map.entry(key.to_owned_key()) {
            if entry.get().cached_key_count > 1 {
                entry.get_mut().cached_key_count -= 1;
                HookCounters::inc(&self.counters.evict_decrements);
            } else {
                entry.remove();
                self.tracked.fetch_sub(1, Ordering::Relaxed);
                HookCounters::inc(&self.counters.entries_removed);
            }
        }
    }

    /// Invalidation count for `key`, 0 if untracked.
    pub fn invalidation_count(&self, key: &KeyCtx<'_>) -> u32 {
        self.stats(key).map_or(0, |stats| stats.invalidation_count)
    }

    /// Resident copy count for `key`, 0 if untracked.
    pub fn cached_key_count(&self, key: &KeyCtx<'_>) -> u32 {
        self.stats(key).map_or(0, |stats| stats.cached_key_count)
    }

    /// Both counts for `key`, if tracked.
    pub fn stats(&self, key: &KeyCtx<'_>) -> Option<KeyStats> {
        let map = self.shard_for(key).read();
        map.get(&key.to_owned_key()).copied()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.tracked.load(Ordering::Relaxed)
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry across all shards.
    ///
    /// All shard locks are acquired before any map is cleared, so concurrent
    /// hooks observe either the full table or the empty one.
    pub fn clear(&self) {
        let mut guards = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            guards.push(shard.write());
        }
        for guard in guards.iter_mut() {
            guard.clear();
        }
        self.tracked.store(0, Ordering::Relaxed);
    }

    /// Snapshot of hook counters and gauges.
    pub fn metrics(&self) -> AdmissionMetricsSnapshot {
        let c = &self.counters;
        AdmissionMetricsSnapshot {
            invalidation_calls: c.invalidation_calls.load(Ordering::Relaxed),
            invalidations_recorded: c.invalidations_recorded.load(Ordering::Relaxed),
            skip_checks: c.skip_checks.load(Ordering::Relaxed),
            skip_decisions: c.skip_decisions.load(Ordering::Relaxed),
            insert_calls: c.insert_calls.load(Ordering::Relaxed),
            inserts_new: c.inserts_new.load(Ordering::Relaxed),
            insert_copies: c.insert_copies.load(Ordering::Relaxed),
            evict_calls: c.evict_calls.load(Ordering::Relaxed),
            evict_decrements: c.evict_decrements.load(Ordering::Relaxed),
            entries_removed: c.entries_removed.load(Ordering::Relaxed),
            tracked_keys: self.len(),
            shard_count: self.shard_count(),
        }
    }

    /// Verifies table invariants; intended for tests on a quiescent table.
    ///
    /// Checks that every entry has `cached_key_count >= 1` and that the
    /// tracked-key gauge matches the per-shard map sizes.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut total = 0;
        for (idx, shard) in self.shards.iter().enumerate() {
            let map = shard.read();
            total += map.len();
            for (key, stats) in map.iter() {
                if stats.cached_key_count == 0 {
                    return Err(InvariantError::new(format!(
                        "shard {idx}: entry for db {} ns {} has cached_key_count 0",
                        key.db().as_u64(),
                        key.namespace(),
                    )));
                }
            }
        }
        let gauge = self.len();
        if total != gauge {
            return Err(InvariantError::new(format!(
                "tracked-key gauge {gauge} != shard map total {total}"
            )));
        }
        Ok(())
    }
}

impl Default for StatsTable {
    /// Table with [`DEFAULT_SHARDS`] shards and seed 0.
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DbId;

    fn key(db: DbId, user_key: &[u8]) -> KeyCtx<'_> {
        KeyCtx::new(db, 0, user_key)
    }

    #[test]
    fn untracked_key_reads_zero() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"never-inserted");

        assert_eq!(table.invalidation_count(&k), 0);
        assert_eq!(table.cached_key_count(&k), 0);
        assert!(table.stats(&k).is_none());
        for threshold in 0..4 {
            assert!(!table.should_skip_insert(&k, threshold));
        }
    }

    #[test]
    fn insert_creates_then_counts_copies() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        table.on_insert(&k);
        assert_eq!(
            table.stats(&k),
            Some(KeyStats {
                cached_key_count: 1,
                invalidation_count: 0,
            })
        );

        table.on_insert(&k);
        assert_eq!(table.cached_key_count(&k), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn evict_decrements_then_removes() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        table.on_insert(&k);
        table.on_insert(&k);

        table.on_evict(&k);
        assert_eq!(table.cached_key_count(&k), 1);
        assert_eq!(table.len(), 1);

        table.on_evict(&k);
        assert_eq!(table.cached_key_count(&k), 0);
        assert!(table.stats(&k).is_none());
        assert!(table.is_empty());

        // Further evicts are no-ops.
        table.on_evict(&k);
        assert!(table.is_empty());
        table.check_invariants().unwrap();
    }

    #[test]
    fn misses_count_only_while_tracked() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        assert!(!table.on_miss(&k));
        assert_eq!(table.invalidation_count(&k), 0);

        table.on_insert(&k);
        for expected in 1..=5 {
            assert!(table.on_miss(&k));
            assert_eq!(table.invalidation_count(&k), expected);
        }
    }

    #[test]
    fn eviction_discards_invalidation_history() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        table.on_insert(&k);
        table.on_miss(&k);
        table.on_miss(&k);
        table.on_evict(&k);

        assert_eq!(table.invalidation_count(&k), 0);
        assert!(!table.should_skip_insert(&k, 2));
    }

    #[test]
    fn skip_threshold_boundary() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        table.on_insert(&k);
        // Tracked with zero invalidations: threshold 0 skips, 1 does not.
        assert!(table.should_skip_insert(&k, 0));
        assert!(!table.should_skip_insert(&k, 1));

        table.on_miss(&k);
        table.on_miss(&k);
        assert!(table.should_skip_insert(&k, 2));
        assert!(!table.should_skip_insert(&k, 3));
    }

    #[test]
    fn clear_drops_all_entries() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        for i in 0..100_u32 {
            let user_key = i.to_be_bytes();
            table.on_insert(&KeyCtx::new(db, i % 3, &user_key));
        }
        assert_eq!(table.len(), 100);

        table.clear();
        assert!(table.is_empty());
        table.check_invariants().unwrap();

        let user_key = 0_u32.to_be_bytes();
        assert_eq!(table.cached_key_count(&KeyCtx::new(db, 0, &user_key)), 0);
    }

    #[test]
    fn same_user_key_isolated_per_db_and_namespace() {
        let table = StatsTable::new(8, 0);
        let db_a = DbId::issue();
        let db_b = DbId::issue();

        table.on_insert(&KeyCtx::new(db_a, 0, b"k"));
        table.on_insert(&KeyCtx::new(db_a, 1, b"k"));
        table.on_insert(&KeyCtx::new(db_b, 0, b"k"));

        table.on_miss(&KeyCtx::new(db_a, 0, b"k"));

        assert_eq!(table.invalidation_count(&KeyCtx::new(db_a, 0, b"k")), 1);
        assert_eq!(table.invalidation_count(&KeyCtx::new(db_a, 1, b"k")), 0);
        assert_eq!(table.invalidation_count(&KeyCtx::new(db_b, 0, b"k")), 0);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn metrics_reflect_hook_activity() {
        let table = StatsTable::new(4, 0);
        let db = DbId::issue();
        let k = key(db, b"abc");

        table.on_insert(&k);
        table.on_insert(&k);
        table.on_miss(&k);
        table.should_skip_insert(&k, 1);
        table.on_evict(&k);
        table.on_evict(&k);

        let m = table.metrics();
        assert_eq!(m.insert_calls, 2);
        assert_eq!(m.inserts_new, 1);
        assert_eq!(m.insert_copies, 1);
        assert_eq!(m.invalidation_calls, 1);
        assert_eq!(m.invalidations_recorded, 1);
        assert_eq!(m.skip_checks, 1);
        assert_eq!(m.skip_decisions, 1);
        assert_eq!(m.evict_calls, 2);
        assert_eq!(m.evict_decrements, 1);
        assert_eq!(m.entries_removed, 1);
        assert_eq!(m.tracked_keys, 0);
        assert_eq!(m.shard_count, 4);
    }
}

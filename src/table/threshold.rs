//! Sharded per-namespace skip-threshold table.
//!
//! Thresholds are configuration, not observation: slots are created or
//! overwritten only by an explicit [`ThresholdTable::set`] and live for the
//! lifetime of the table. `StatsTable::clear` never touches them.
//!
//! Sharded the same way as the statistics table. Once a slot exists its
//! value is an `AtomicU32`, so overwrites take only the shard's read lock;
//! slot creation takes the write lock.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ds::ShardSelector;
use crate::key::{DbId, NsKey};

/// Skip threshold applied to namespaces that were never configured.
pub const DEFAULT_SKIP_THRESHOLD: u32 = 3;

/// Sharded concurrent map from (database, namespace) to skip threshold.
///
/// # Example
///
/// ```
/// use admitkit::key::DbId;
/// use admitkit::table::threshold::{ThresholdTable, DEFAULT_SKIP_THRESHOLD};
///
/// let table = ThresholdTable::new(4, 0);
/// let db = DbId::issue();
///
/// assert_eq!(table.get(db, 0), DEFAULT_SKIP_THRESHOLD);
/// table.set(db, 0, 7);
/// assert_eq!(table.get(db, 0), 7);
/// ```
#[derive(Debug)]
pub struct ThresholdTable {
    shards: Vec<RwLock<FxHashMap<NsKey, AtomicU32>>>,
    selector: ShardSelector,
    default: u32,
}

impl ThresholdTable {
    /// Creates a table returning [`DEFAULT_SKIP_THRESHOLD`] for unset
    /// namespaces.
    pub fn new(shards: usize, seed: u64) -> Self {
        Self::with_default(shards, seed, DEFAULT_SKIP_THRESHOLD)
    }

    /// Creates a table with a custom default threshold.
    pub fn with_default(shards: usize, seed: u64, default: u32) -> Self {
        let selector = ShardSelector::new(shards, seed);
        let mut shard_vec = Vec::with_capacity(selector.shard_count());
        for _ in 0..selector.shard_count() {
            shard_vec.push(RwLock::new(FxHashMap::default()));
        }
        Self {
            shards: shard_vec,
            selector,
            default,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The threshold returned for namespaces that were never set.
    pub fn default_threshold(&self) -> u32 {
        self.default
    }

    fn shard_for(&self, key: &NsKey) -> &RwLock<FxHashMap<NsKey, AtomicU32>> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    /// Upserts the threshold for `(db, namespace)`.
    pub fn set(&self, db: DbId, namespace: u32, value: u32) {
        let key = NsKey { db, namespace };
        let shard = self.shard_for(&key);
        {
            let map = shard.read();
            if let Some(slot) = map.get(&key) {
                slot.store(value, Ordering::Relaxed);
                return;
            }
        }
        // Slot creation needs the write lock; the store afterwards covers a
        // racing creator that won the entry.
        let mut map = shard.write();
        map.entry(key)
            .or_insert_with(|| AtomicU32::new(value))
            .store(value, Ordering::Relaxed);
    }

    /// The configured threshold for `(db, namespace)`, or the table default
    /// if never set.
    pub fn get(&self, db: DbId, namespace: u32) -> u32 {
        let key = NsKey { db, namespace };
        let map = self.shard_for(&key).read();
        map.get(&key)
            .map_or(self.default, |slot| slot.load(Ordering::Relaxed))
    }
}

impl Default for ThresholdTable {
    /// Table with the statistics table's default shard count and seed 0.
    fn default() -> Self {
        Self::new(crate::table::stats::DEFAULT_SHARDS, 0)
    }
}

//! Row-cache admission policy facade.
//!
//! Composes the statistics table, the threshold table, and the hybrid-mode
//! flag into the hooks the owning row cache calls at four points of its own
//! lifecycle: lookup miss, pre-insert, post-insert, and evict. The facade
//! adds no behavior beyond routing and the key-triple-to-owned-copy
//! conversion performed inside the tables.
//!
//! The policy is an explicitly constructed service object owned by the
//! hosting cache; there is no process-global instance. Tests construct a
//! fresh policy per test.

use crate::builder::AdmissionPolicyBuilder;
use crate::error::InvariantError;
use crate::hybrid::HybridMode;
use crate::key::{DbId, KeyCtx};
use crate::metrics::AdmissionMetricsSnapshot;
use crate::table::stats::StatsTable;
use crate::table::threshold::ThresholdTable;

// Keeps the two tables from sharing hot shards for correlated keys.
const THRESHOLD_SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Adaptive admission policy for a row-level cache.
///
/// Tracks per-key invalidations and decides, against a per-namespace
/// threshold, whether a key has proven too volatile to benefit from caching.
/// All hooks may be called concurrently from arbitrary threads; operations
/// on the identical key triple are serialized by the owning shard's lock.
///
/// # Example
///
/// ```
/// use admitkit::prelude::*;
///
/// let policy = AdmissionPolicy::new();
/// let db = DbId::issue();
/// let key = KeyCtx::new(db, 0, b"abc");
///
/// policy.set_threshold(db, 0, 2);
///
/// policy.on_row_cache_insert(&key);
/// policy.on_row_cache_invalidation(&key);
/// policy.on_row_cache_invalidation(&key);
///
/// // Two observed invalidations reach the configured threshold.
/// assert!(policy.should_skip_row_cache_insert_configured(&key));
///
/// // Evicting the last copy discards the key's history.
/// policy.on_row_cache_evict(&key);
/// assert_eq!(policy.invalidation_count(&key), 0);
/// assert!(!policy.should_skip_row_cache_insert(&key, 2));
/// ```
#[derive(Debug)]
pub struct AdmissionPolicy {
    stats: StatsTable,
    thresholds: ThresholdTable,
    hybrid: HybridMode,
}

impl AdmissionPolicy {
    /// Policy with the default configuration (64 shards, default threshold
    /// 3, hybrid mode off).
    pub fn new() -> Self {
        AdmissionPolicyBuilder::new().build()
    }

    pub(crate) fn from_config(shards: usize, seed: u64, default_threshold: u32) -> Self {
        Self {
            stats: StatsTable::new(shards, seed),
            thresholds: ThresholdTable::with_default(
                shards,
                seed ^ THRESHOLD_SEED_MIX,
                default_threshold,
            ),
            hybrid: HybridMode::new(),
        }
    }

    /// Hook: called immediately after a row-cache lookup miss.
    ///
    /// Returns true iff an invalidation was recorded, i.e. the key was
    /// believed resident.
    pub fn on_row_cache_invalidation(&self, key: &KeyCtx<'_>) -> bool {
        self.stats.on_miss(key)
    }

    /// Hook: called immediately before a row-cache insert. True means the
    /// caller must skip the insert and take the migration path instead.
    pub fn should_skip_row_cache_insert(&self, key: &KeyCtx<'_>, threshold: u32) -> bool {
        self.stats.should_skip_insert(key, threshold)
    }

    /// [`should_skip_row_cache_insert`](Self::should_skip_row_cache_insert)
    /// against the threshold configured for the key's namespace.
    pub fn should_skip_row_cache_insert_configured(&self, key: &KeyCtx<'_>) -> bool {
        let threshold = self.thresholds.get(key.db, key.namespace);
        self.stats.should_skip_insert(key, threshold)
    }

    /// Hook: called immediately after a successful row-cache insert.
    pub fn on_row_cache_insert(&self, key: &KeyCtx<'_>) {
        self.stats.on_insert(key);
    }

    /// Hook: called when the row cache evicts or removes the key.
    pub fn on_row_cache_evict(&self, key: &KeyCtx<'_>) {
        self.stats.on_evict(key);
    }

    /// Invalidation count for `key`, 0 if untracked.
    pub fn invalidation_count(&self, key: &KeyCtx<'_>) -> u32 {
        self.stats.invalidation_count(key)
    }

    /// Resident copy count for `key`, 0 if untracked.
    pub fn cached_key_count(&self, key: &KeyCtx<'_>) -> u32 {
        self.stats.cached_key_count(key)
    }

    /// Drops every statistics entry. Thresholds are configuration and
    /// survive; only key statistics are reset.
    pub fn clear_all(&self) {
        self.stats.clear();
    }

    /// Upserts the skip threshold for `(db, namespace)`.
    pub fn set_threshold(&self, db: DbId, namespace: u32, value: u32) {
        self.thresholds.set(db, namespace, value);
    }

    /// The configured skip threshold for `(db, namespace)`, or the default
    /// (3 unless built otherwise) if never set.
    pub fn threshold(&self, db: DbId, namespace: u32) -> u32 {
        self.thresholds.get(db, namespace)
    }

    /// Turns hybrid mode on or off.
    ///
    /// The policy does not gate its own hooks on this flag; the owning cache
    /// consults it before calling anything else.
    pub fn set_hybrid_enabled(&self, on: bool) {
        self.hybrid.set_enabled(on);
    }

    /// Whether hybrid mode is on. Default is off.
    pub fn is_hybrid_enabled(&self) -> bool {
        self.hybrid.is_enabled()
    }

    /// Number of currently tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.stats.len()
    }

    /// Snapshot of hook counters and gauges.
    pub fn metrics(&self) -> AdmissionMetricsSnapshot {
        self.stats.metrics()
    }

    /// Verifies statistics-table invariants; intended for tests on a
    /// quiescent policy.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.stats.check_invariants()
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

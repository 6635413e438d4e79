//! Counter snapshots exposed by the admission policy.

/// Point-in-time view of admission-policy activity.
///
/// Counters are maintained with relaxed atomics inside
/// [`StatsTable`](crate::table::stats::StatsTable); a snapshot is therefore
/// internally consistent only when the table is quiescent, which is fine for
/// the introspection and test uses it serves.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdmissionMetricsSnapshot {
    pub invalidation_calls: u64,
    pub invalidations_recorded: u64,

    pub skip_checks: u64,
    pub skip_decisions: u64,

    pub insert_calls: u64,
    pub inserts_new: u64,
    pub insert_copies: u64, // additional copies of an already-tracked key

    pub evict_calls: u64,
    pub evict_decrements: u64,
    pub entries_removed: u64,

    // gauges captured at snapshot time
    pub tracked_keys: usize,
    pub shard_count: usize,
}

//! Deterministic key-to-shard mapping shared by the sharded tables.
//!
//! Both [`StatsTable`](crate::table::stats::StatsTable) and
//! [`ThresholdTable`](crate::table::threshold::ThresholdTable) split their
//! maps across independently locked shards. The selector guarantees that the
//! same key always lands in the same shard, which is what serializes all
//! operations on one key behind a single lock.
//!
//! Properties:
//! - Deterministic: the same `(key, seed, shards)` always yields the same
//!   shard index.
//! - Seed isolation: different seeds produce different distributions, so two
//!   tables sharing a key type do not share hot shards.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeded, deterministic shard selector.
///
/// Maps any `Hash`able key to an index in `[0, shards)`.
///
/// # Example
///
/// ```
/// use admitkit::ds::ShardSelector;
///
/// let selector = ShardSelector::new(8, 42);
/// let shard = selector.shard_for_key(&"user:123");
/// assert!(shard < 8);
/// assert_eq!(selector.shard_for_key(&"user:123"), shard);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is clamped to at least 1; callers that want zero to
    /// be an error validate before constructing (see
    /// [`AdmissionPolicyBuilder`](crate::builder::AdmissionPolicyBuilder)).
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards
    }
}

impl Default for ShardSelector {
    /// Single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}

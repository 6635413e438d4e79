//! Shared data-structure helpers.

mod shard;

pub use shard::ShardSelector;

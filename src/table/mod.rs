//! Sharded concurrent tables backing the admission policy.

pub mod stats;
pub mod threshold;

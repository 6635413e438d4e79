//! admitkit: adaptive admission tracking for row caches.
//!
//! Tracks, per logical key, how often a cached copy of that key is observed
//! invalidated, and decides from a per-namespace threshold whether future
//! insert attempts for that key should be skipped (diverted to a migration
//! path) because the key is too volatile to benefit from caching.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod ds;
pub mod error;
pub mod hybrid;
pub mod key;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod table;

pub use crate::builder::AdmissionPolicyBuilder;
pub use crate::ds::ShardSelector;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::hybrid::HybridMode;
pub use crate::key::{DbId, KeyCtx, NsKey, OwnedKey};
pub use crate::metrics::AdmissionMetricsSnapshot;
pub use crate::policy::admission::AdmissionPolicy;
pub use crate::table::stats::{KeyStats, StatsTable, DEFAULT_SHARDS};
pub use crate::table::threshold::{ThresholdTable, DEFAULT_SKIP_THRESHOLD};

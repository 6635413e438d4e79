//! Builder for [`AdmissionPolicy`] with validated configuration.
//!
//! ## Example
//!
//! ```
//! use admitkit::builder::AdmissionPolicyBuilder;
//!
//! let policy = AdmissionPolicyBuilder::new()
//!     .shards(16)
//!     .default_threshold(5)
//!     .try_build()
//!     .unwrap();
//!
//! let db = admitkit::key::DbId::issue();
//! assert_eq!(policy.threshold(db, 0), 5);
//! ```

use crate::error::ConfigError;
use crate::policy::admission::AdmissionPolicy;
use crate::table::stats::DEFAULT_SHARDS;
use crate::table::threshold::DEFAULT_SKIP_THRESHOLD;

/// Configures and constructs an [`AdmissionPolicy`].
#[derive(Debug, Clone)]
pub struct AdmissionPolicyBuilder {
    shards: usize,
    seed: u64,
    default_threshold: u32,
}

impl AdmissionPolicyBuilder {
    /// Starts from the defaults: 64 shards, seed 0, default threshold 3.
    pub fn new() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            seed: 0,
            default_threshold: DEFAULT_SKIP_THRESHOLD,
        }
    }

    /// Number of independently locked shards per table. Must be at least 1.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Seed for the key-to-shard hash.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Threshold returned for namespaces that were never explicitly set.
    pub fn default_threshold(mut self, threshold: u32) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Builds the policy, validating the configuration.
    pub fn try_build(self) -> Result<AdmissionPolicy, ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::new("shard count must be greater than zero"));
        }
        Ok(AdmissionPolicy::from_config(
            self.shards,
            self.seed,
            self.default_threshold,
        ))
    }

    /// Builds the policy.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; use
    /// [`try_build`](Self::try_build) to handle that as an error.
    pub fn build(self) -> AdmissionPolicy {
        match self.try_build() {
            Ok(policy) => policy,
            Err(err) => panic!("invalid admission policy configuration: {err}"),
        }
    }
}

impl Default for AdmissionPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

/// Hybrid-mode toggle gating whether the admission policy is consulted.
///
/// The policy never gates its own behavior on this flag; the owning cache
/// checks it before invoking any other hook. Default is off.
#[derive(Debug, Default)]
pub struct HybridMode {
    enabled: AtomicBool,
}

impl HybridMode {
    /// Creates a flag in the off state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the policy on or off.
    #[inline]
    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::Relaxed);
    }

    /// Whether the policy should be consulted.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

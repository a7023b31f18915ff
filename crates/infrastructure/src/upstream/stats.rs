use ferrous_lb_domain::ClusterStatsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

/// Resolution counters of a logical DNS cluster
///
/// Written by the resolution loop only, read by administrative output.
#[derive(Debug, Default)]
pub struct ClusterStats {
    /// Resolutions started
    update_attempt: AtomicU64,

    /// Resolutions completed, including ones that returned no address
    update_success: AtomicU64,

    /// Resolved address changes broadcast to the workers
    update_address_changed: AtomicU64,
}

impl ClusterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_update_attempt(&self) {
        self.update_attempt.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_update_success(&self) {
        self.update_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_update_address_changed(&self) {
        self.update_address_changed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_attempt(&self) -> u64 {
        self.update_attempt.load(Ordering::Relaxed)
    }

    pub fn update_success(&self) -> u64 {
        self.update_success.load(Ordering::Relaxed)
    }

    pub fn update_address_changed(&self) -> u64 {
        self.update_address_changed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ClusterStatsSnapshot {
        ClusterStatsSnapshot {
            update_attempt: self.update_attempt(),
            update_success: self.update_success(),
            update_address_changed: self.update_address_changed(),
        }
    }
}

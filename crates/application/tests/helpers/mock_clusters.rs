#![allow(dead_code)]

use ferrous_lb_application::ports::ClusterIntrospection;
use ferrous_lb_domain::{ClusterPhase, ClusterStatsSnapshot, ClusterStatus};
use std::net::SocketAddr;

// ============================================================================
// Mock ClusterIntrospection
// ============================================================================

pub struct MockCluster {
    status: ClusterStatus,
}

impl MockCluster {
    pub fn new(name: &str, hostname: &str, port: u16) -> Self {
        Self {
            status: ClusterStatus {
                name: name.to_string(),
                hostname: hostname.to_string(),
                port,
                phase: ClusterPhase::Initializing,
                resolved_address: None,
                health_check_address: None,
                stats: ClusterStatsSnapshot::default(),
            },
        }
    }

    pub fn resolved(mut self, address: &str) -> Self {
        let address: SocketAddr = address.parse().unwrap();
        self.status.phase = ClusterPhase::Active;
        self.status.resolved_address = Some(address);
        self.status.health_check_address = Some(address);
        self.status.stats = ClusterStatsSnapshot {
            update_attempt: 1,
            update_success: 1,
            update_address_changed: 1,
        };
        self
    }
}

impl ClusterIntrospection for MockCluster {
    fn name(&self) -> &str {
        &self.status.name
    }

    fn status(&self) -> ClusterStatus {
        self.status.clone()
    }
}

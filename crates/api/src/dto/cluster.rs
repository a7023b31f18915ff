use ferrous_lb_domain::{ClusterStatsSnapshot, ClusterStatus};
use serde::{Deserialize, Serialize};

/// Response DTO for a logical DNS cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResponse {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub phase: String,
    pub resolved_address: Option<String>,
    pub health_check_address: Option<String>,
    pub stats: ClusterStatsResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatsResponse {
    pub update_attempt: u64,
    pub update_success: u64,
    pub update_address_changed: u64,
}

impl From<ClusterStatsSnapshot> for ClusterStatsResponse {
    fn from(stats: ClusterStatsSnapshot) -> Self {
        Self {
            update_attempt: stats.update_attempt,
            update_success: stats.update_success,
            update_address_changed: stats.update_address_changed,
        }
    }
}

impl From<ClusterStatus> for ClusterResponse {
    fn from(status: ClusterStatus) -> Self {
        Self {
            name: status.name,
            hostname: status.hostname,
            port: status.port,
            phase: status.phase.to_string(),
            resolved_address: status.resolved_address.map(|a| a.to_string()),
            health_check_address: status.health_check_address.map(|a| a.to_string()),
            stats: status.stats.into(),
        }
    }
}

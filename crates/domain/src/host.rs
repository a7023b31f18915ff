use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Where an endpoint lives. All fields are optional labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Locality {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub sub_zone: String,
}

/// Snapshot of the host that a connection was created for.
///
/// Captured at connection creation time; later address changes of the
/// cluster do not affect an existing description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostDescription {
    pub cluster_name: Arc<str>,
    pub hostname: Arc<str>,
    pub address: SocketAddr,
    pub locality: Locality,
    pub priority: u32,
    pub metadata: BTreeMap<String, String>,
    pub load_balancing_weight: u32,
}

/// Lifecycle phase of a cluster once construction has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPhase {
    /// First resolution cycle in flight
    Initializing,
    /// Steady-state refresh loop
    Active,
    TearingDown,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Active => write!(f, "active"),
            Self::TearingDown => write!(f, "tearing_down"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStatsSnapshot {
    pub update_attempt: u64,
    pub update_success: u64,
    pub update_address_changed: u64,
}

/// Read-only view of a cluster for administrative output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterStatus {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub phase: ClusterPhase,
    pub resolved_address: Option<SocketAddr>,
    pub health_check_address: Option<SocketAddr>,
    pub stats: ClusterStatsSnapshot,
}

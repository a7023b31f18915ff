//! Ferrous LB Domain Layer
pub mod config;
pub mod errors;
pub mod host;

pub use config::{
    CliOverrides, ClusterConfig, Config, ConfigError, ConnectionOptions, DnsLookupFamily,
    LbEndpoint, LoadAssignment, LocalityLbEndpoints, LogicalDnsSettings, SocketAddressConfig,
};
pub use errors::DomainError;
pub use host::{ClusterPhase, ClusterStatsSnapshot, ClusterStatus, HostDescription, Locality};

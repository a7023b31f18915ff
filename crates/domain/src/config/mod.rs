//! Configuration module for Ferrous LB
//!
//! This module contains all configuration structures organized by domain:
//! - `root`: Main configuration and CLI overrides
//! - `server`: Admin server binding
//! - `workers`: Worker thread pool sizing
//! - `cluster`: Logical DNS cluster definitions and their validation
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod cluster;
pub mod errors;
pub mod logging;
pub mod root;
pub mod server;
pub mod workers;

pub use cluster::{
    ClusterConfig, ConnectionOptions, DnsLookupFamily, LbEndpoint, LoadAssignment,
    LocalityLbEndpoints, LogicalDnsSettings, SocketAddressConfig,
};
pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use workers::WorkerConfig;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// These are fatal at load time and never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("LOGICAL_DNS clusters must have a single locality_lb_endpoint and a single lb_endpoint")]
    LoadAssignmentCardinality,

    #[error("LOGICAL_DNS clusters must have a single host")]
    HostsCardinality,

    #[error("LOGICAL_DNS clusters must NOT have a custom resolver name set")]
    CustomResolverName,

    #[error("Invalid TCP URL '{url}': {reason}")]
    InvalidTcpUrl { url: String, reason: String },

    #[error("Invalid cluster '{cluster}': {source}")]
    InvalidCluster {
        cluster: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::errors::ConfigError;
use crate::host::Locality;

const TCP_SCHEME: &str = "tcp://";

/// Address family preference used when resolving a cluster hostname.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsLookupFamily {
    V4Only,
    V6Only,
    /// Prefer IPv6 results, fall back to IPv4.
    #[default]
    Auto,
}

/// A socket address as written in configuration, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SocketAddressConfig {
    pub address: String,

    pub port_value: u16,

    /// Name of a custom resolver. Logical DNS clusters reject any non-empty value.
    #[serde(default)]
    pub resolver_name: Option<String>,
}

/// A single load balancing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LbEndpoint {
    pub address: SocketAddressConfig,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default = "default_weight")]
    pub load_balancing_weight: u32,
}

impl From<SocketAddressConfig> for LbEndpoint {
    fn from(address: SocketAddressConfig) -> Self {
        Self {
            address,
            metadata: BTreeMap::new(),
            load_balancing_weight: default_weight(),
        }
    }
}

/// Endpoints sharing a locality and a priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalityLbEndpoints {
    #[serde(default)]
    pub locality: Locality,

    #[serde(default)]
    pub priority: u32,

    #[serde(default)]
    pub lb_endpoints: Vec<LbEndpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadAssignment {
    #[serde(default)]
    pub endpoints: Vec<LocalityLbEndpoints>,
}

/// Socket options applied to upstream connections
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionOptions {
    #[serde(default = "default_true")]
    pub nodelay: bool,

    #[serde(default)]
    pub keepalive: bool,

    #[serde(default)]
    pub send_buffer_size: Option<u32>,

    #[serde(default)]
    pub recv_buffer_size: Option<u32>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: false,
            send_buffer_size: None,
            recv_buffer_size: None,
        }
    }
}

/// Logical DNS cluster configuration
///
/// The target endpoint is given either as a `load_assignment` or through the
/// legacy `hosts` list. Exactly one endpoint must be configured in total.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    pub name: String,

    /// Interval between re-resolutions in milliseconds (default: 5000)
    #[serde(default = "default_dns_refresh_rate_ms")]
    pub dns_refresh_rate_ms: u64,

    #[serde(default)]
    pub dns_lookup_family: DnsLookupFamily,

    /// Upper bound for a single resolution in milliseconds (default: 5000)
    #[serde(default = "default_dns_resolve_timeout_ms")]
    pub dns_resolve_timeout_ms: u64,

    #[serde(default)]
    pub hosts: Vec<SocketAddressConfig>,

    #[serde(default)]
    pub load_assignment: Option<LoadAssignment>,

    #[serde(default)]
    pub connection: ConnectionOptions,
}

/// Settings derived from a validated [`ClusterConfig`]. Immutable for the
/// lifetime of the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDnsSettings {
    pub cluster_name: String,
    pub hostname: String,
    pub port: u16,
    pub dns_lookup_family: DnsLookupFamily,
    pub refresh_interval: Duration,
    pub resolve_timeout: Duration,
    pub locality_lb_endpoints: LocalityLbEndpoints,
    pub lb_endpoint: LbEndpoint,
    pub connection: ConnectionOptions,
}

impl ClusterConfig {
    /// Creates a cluster targeting `address:port` through the `hosts` form.
    pub fn new(name: impl Into<String>, address: impl Into<String>, port_value: u16) -> Self {
        Self {
            name: name.into(),
            dns_refresh_rate_ms: default_dns_refresh_rate_ms(),
            dns_lookup_family: DnsLookupFamily::default(),
            dns_resolve_timeout_ms: default_dns_resolve_timeout_ms(),
            hosts: vec![SocketAddressConfig {
                address: address.into(),
                port_value,
                resolver_name: None,
            }],
            load_assignment: None,
            connection: ConnectionOptions::default(),
        }
    }

    /// Endpoint groups of this cluster. The legacy `hosts` list translates to
    /// a single group at priority 0 with an empty locality.
    pub fn locality_lb_endpoints(&self) -> Vec<LocalityLbEndpoints> {
        match &self.load_assignment {
            Some(assignment) => assignment.endpoints.clone(),
            None => vec![LocalityLbEndpoints {
                locality: Locality::default(),
                priority: 0,
                lb_endpoints: self.hosts.iter().cloned().map(LbEndpoint::from).collect(),
            }],
        }
    }

    /// Validates this cluster as a logical DNS cluster and derives its settings.
    pub fn logical_dns_settings(&self) -> Result<LogicalDnsSettings, ConfigError> {
        let groups = self.locality_lb_endpoints();
        let (locality_lb_endpoints, lb_endpoint) = match groups.as_slice() {
            [group] if group.lb_endpoints.len() == 1 => (group.clone(), group.lb_endpoints[0].clone()),
            _ if self.load_assignment.is_some() => {
                return Err(ConfigError::LoadAssignmentCardinality)
            }
            _ => return Err(ConfigError::HostsCardinality),
        };

        let socket_address = &lb_endpoint.address;
        if socket_address
            .resolver_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
        {
            return Err(ConfigError::CustomResolverName);
        }

        let url = tcp_url(&socket_address.address, socket_address.port_value);
        let hostname = host_from_tcp_url(&url)?;
        let port = port_from_tcp_url(&url)?;

        if self.dns_refresh_rate_ms == 0 {
            return Err(ConfigError::Validation(
                "dns_refresh_rate_ms must be greater than zero".into(),
            ));
        }

        Ok(LogicalDnsSettings {
            cluster_name: self.name.clone(),
            hostname,
            port,
            dns_lookup_family: self.dns_lookup_family,
            refresh_interval: Duration::from_millis(self.dns_refresh_rate_ms),
            resolve_timeout: Duration::from_millis(self.dns_resolve_timeout_ms),
            locality_lb_endpoints,
            lb_endpoint,
            connection: self.connection.clone(),
        })
    }
}

pub fn tcp_url(address: &str, port: u16) -> String {
    format!("{}{}:{}", TCP_SCHEME, address, port)
}

/// Extracts the host part of a `tcp://host:port` URL.
pub fn host_from_tcp_url(url: &str) -> Result<String, ConfigError> {
    let (host, _) = split_tcp_url(url)?;
    if host.is_empty() {
        return Err(invalid_url(url, "missing host"));
    }
    if host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid_url(url, "host contains invalid characters"));
    }
    Ok(host.to_string())
}

/// Extracts the port part of a `tcp://host:port` URL.
pub fn port_from_tcp_url(url: &str) -> Result<u16, ConfigError> {
    let (_, port) = split_tcp_url(url)?;
    port.parse::<u16>()
        .map_err(|e| invalid_url(url, &format!("invalid port '{}': {}", port, e)))
}

fn split_tcp_url(url: &str) -> Result<(&str, &str), ConfigError> {
    let rest = url
        .strip_prefix(TCP_SCHEME)
        .ok_or_else(|| invalid_url(url, "expected tcp:// scheme"))?;
    rest.rsplit_once(':')
        .ok_or_else(|| invalid_url(url, "missing port"))
}

fn invalid_url(url: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidTcpUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn default_dns_refresh_rate_ms() -> u64 {
    5000
}

fn default_dns_resolve_timeout_ms() -> u64 {
    5000
}

fn default_weight() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

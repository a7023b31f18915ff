use ferrous_lb_domain::{ClusterConfig, DnsLookupFamily, SocketAddressConfig};

/// Builder for logical DNS cluster configurations used in tests
pub struct ClusterConfigBuilder {
    config: ClusterConfig,
}

impl ClusterConfigBuilder {
    pub fn new(hostname: &str, port: u16) -> Self {
        Self {
            config: ClusterConfig::new("backend", hostname, port),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    pub fn refresh_ms(mut self, ms: u64) -> Self {
        self.config.dns_refresh_rate_ms = ms;
        self
    }

    pub fn family(mut self, family: DnsLookupFamily) -> Self {
        self.config.dns_lookup_family = family;
        self
    }

    pub fn extra_host(mut self, address: &str, port: u16) -> Self {
        self.config.hosts.push(SocketAddressConfig {
            address: address.to_string(),
            port_value: port,
            resolver_name: None,
        });
        self
    }

    pub fn resolver_name(mut self, name: &str) -> Self {
        self.config.hosts[0].resolver_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> ClusterConfig {
        self.config
    }
}

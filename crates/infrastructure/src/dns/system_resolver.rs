use async_trait::async_trait;
use ferrous_lb_application::ports::DnsResolver;
use ferrous_lb_domain::DnsLookupFamily;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Resolves through the operating system resolver (`getaddrinfo`).
///
/// Failures and timeouts are reported as an empty result.
pub struct SystemDnsResolver {
    timeout: Duration,
}

impl SystemDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemDnsResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, hostname: &str, family: DnsLookupFamily) -> Vec<IpAddr> {
        let host = hostname.trim_start_matches('[').trim_end_matches(']');

        match timeout(self.timeout, lookup_host((host, 0))).await {
            Ok(Ok(addrs)) => {
                let ordered = order_by_family(addrs.map(|addr| addr.ip()), family);
                debug!(hostname = %hostname, results = ordered.len(), "System lookup finished");
                ordered
            }
            Ok(Err(e)) => {
                warn!(hostname = %hostname, error = %e, "System lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    hostname = %hostname,
                    timeout = ?self.timeout,
                    "System lookup timed out"
                );
                Vec::new()
            }
        }
    }
}

/// Applies the family preference to lookup results, dropping duplicates and
/// keeping the original order within a family. `Auto` returns the IPv6
/// results when there are any, the IPv4 ones otherwise.
pub fn order_by_family(addrs: impl IntoIterator<Item = IpAddr>, family: DnsLookupFamily) -> Vec<IpAddr> {
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();
    for addr in addrs {
        let bucket = if addr.is_ipv4() { &mut v4 } else { &mut v6 };
        if !bucket.contains(&addr) {
            bucket.push(addr);
        }
    }

    match family {
        DnsLookupFamily::V4Only => v4,
        DnsLookupFamily::V6Only => v6,
        DnsLookupFamily::Auto if v6.is_empty() => v4,
        DnsLookupFamily::Auto => v6,
    }
}

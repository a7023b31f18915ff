use async_trait::async_trait;
use ferrous_lb_domain::DnsLookupFamily;
use std::net::IpAddr;

/// Asynchronous hostname resolution.
///
/// The returned list is ordered by preference; callers may only use the first
/// entry. An empty list means "no address this time" and is also how
/// implementations report lookup failures. Dropping the future before it
/// completes cancels the query.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, hostname: &str, family: DnsLookupFamily) -> Vec<IpAddr>;
}

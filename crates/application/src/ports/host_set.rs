use ferrous_lb_domain::{Locality, LocalityLbEndpoints};
use std::net::SocketAddr;
use std::sync::Arc;

/// A host as seen by load balancing.
pub trait Host: Send + Sync {
    fn cluster_name(&self) -> &str;

    fn hostname(&self) -> &str;

    /// Address the host was created with. For logical hosts this is a
    /// placeholder and is only meaningful for administrative output.
    fn address(&self) -> SocketAddr;

    fn health_check_address(&self) -> Option<SocketAddr>;

    fn locality(&self) -> &Locality;

    fn priority(&self) -> u32;
}

/// The priority/host-set model consumed by load balancing.
pub trait HostSetRegistry: Send + Sync {
    /// Make `host` visible at the priority of `endpoints`.
    fn register_host(&self, host: Arc<dyn Host>, endpoints: &LocalityLbEndpoints);
}

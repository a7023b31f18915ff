use arc_swap::ArcSwapOption;
use ferrous_lb_application::ports::{ConnectionFactory, Dispatcher, Host};
use ferrous_lb_domain::{
    ConnectionOptions, DomainError, HostDescription, Locality, LogicalDnsSettings,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error};

use crate::worker::Slot;

/// Address last broadcast to a worker thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerThreadHostData {
    pub current_resolved_address: Option<SocketAddr>,
}

/// A freshly created connection together with the host it was created for.
pub struct CreateConnectionData<T> {
    pub connection: T,
    pub host_description: HostDescription,
}

/// The single host of a logical DNS cluster.
///
/// The host is created once, on the first successful resolution, and lives as
/// long as the cluster. Its own address is a bind-any placeholder; connections
/// go to whatever address was last broadcast to the calling worker.
pub struct LogicalHost<C: ConnectionFactory> {
    settings: Arc<LogicalDnsSettings>,
    cluster_name: Arc<str>,
    hostname: Arc<str>,
    address: SocketAddr,
    health_check_address: ArcSwapOption<SocketAddr>,
    tls: Slot<PerThreadHostData>,
    connector: Arc<C>,
}

impl<C: ConnectionFactory> LogicalHost<C> {
    pub(crate) fn new(
        settings: Arc<LogicalDnsSettings>,
        resolved_ip: &IpAddr,
        tls: Slot<PerThreadHostData>,
        connector: Arc<C>,
    ) -> Self {
        Self {
            cluster_name: Arc::from(settings.cluster_name.as_str()),
            hostname: Arc::from(settings.hostname.as_str()),
            address: any_address_like(resolved_ip),
            health_check_address: ArcSwapOption::empty(),
            settings,
            tls,
            connector,
        }
    }

    /// Socket options configured for the cluster.
    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.settings.connection
    }

    /// Opens a connection from the calling worker to the address cached on
    /// that worker.
    ///
    /// Fails with [`DomainError::NoResolvedAddress`] when nothing has been
    /// broadcast to this thread yet. After cluster initialization this is a
    /// lifecycle bug, never a condition to paper over with a default address.
    pub fn create_connection(
        &self,
        dispatcher: &Dispatcher,
        options: &ConnectionOptions,
    ) -> Result<CreateConnectionData<C::Connection>, DomainError> {
        let data = self.tls.with(|data| *data);
        let Some(address) = data.current_resolved_address else {
            error!(
                cluster = %self.cluster_name,
                worker = dispatcher.name(),
                "Connection requested before a resolved address reached this worker"
            );
            return Err(DomainError::NoResolvedAddress(self.cluster_name.to_string()));
        };

        debug!(
            cluster = %self.cluster_name,
            worker = dispatcher.name(),
            address = %address,
            "Creating upstream connection"
        );

        let connection = self
            .connector
            .create_connection(dispatcher, address, options)?;

        Ok(CreateConnectionData {
            connection,
            host_description: self.describe(address),
        })
    }

    /// Advertises `address` as the health check target. Existing connections
    /// are unaffected.
    pub(crate) fn set_health_check_address(&self, address: SocketAddr) {
        self.health_check_address.store(Some(Arc::new(address)));
    }

    fn describe(&self, address: SocketAddr) -> HostDescription {
        let endpoints = &self.settings.locality_lb_endpoints;
        let lb_endpoint = &self.settings.lb_endpoint;
        HostDescription {
            cluster_name: Arc::clone(&self.cluster_name),
            hostname: Arc::clone(&self.hostname),
            address,
            locality: endpoints.locality.clone(),
            priority: endpoints.priority,
            metadata: lb_endpoint.metadata.clone(),
            load_balancing_weight: lb_endpoint.load_balancing_weight,
        }
    }
}

impl<C: ConnectionFactory> Host for LogicalHost<C> {
    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn address(&self) -> SocketAddr {
        self.address
    }

    fn health_check_address(&self) -> Option<SocketAddr> {
        self.health_check_address.load_full().map(|address| *address)
    }

    fn locality(&self) -> &Locality {
        &self.settings.locality_lb_endpoints.locality
    }

    fn priority(&self) -> u32 {
        self.settings.locality_lb_endpoints.priority
    }
}

/// Bind-any address of the same IP version as `ip`.
fn any_address_like(ip: &IpAddr) -> SocketAddr {
    match ip {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

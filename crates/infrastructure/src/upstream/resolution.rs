use ferrous_lb_application::ports::{ConnectionFactory, DnsResolver, Host, HostSetRegistry};
use ferrous_lb_domain::{ClusterPhase, DnsLookupFamily};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::logical_dns::ClusterShared;
use super::logical_host::LogicalHost;
use crate::worker::BroadcastCompletion;

pub(crate) type InitializeCallback = Box<dyn FnOnce() + Send + 'static>;

/// An in-flight resolution. Aborting it drops the resolver future, so its
/// result can never be delivered afterwards.
struct ActiveQuery {
    handle: JoinHandle<Vec<IpAddr>>,
}

impl ActiveQuery {
    fn spawn(resolver: Arc<dyn DnsResolver>, hostname: Arc<str>, family: DnsLookupFamily) -> Self {
        let handle = tokio::spawn(async move { resolver.resolve(&hostname, family).await });
        Self { handle }
    }

    async fn wait(&mut self) -> Vec<IpAddr> {
        match (&mut self.handle).await {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!(error = %e, "DNS query task failed");
                Vec::new()
            }
        }
    }

    fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for ActiveQuery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

enum CycleOutcome<C: ConnectionFactory> {
    Unchanged,
    /// The address changed. `new_host` is set when this cycle created the
    /// logical host, which stays unpublished until the broadcast completes.
    Broadcast {
        completion: BroadcastCompletion,
        new_host: Option<Arc<LogicalHost<C>>>,
    },
    ClusterGone,
}

/// Resolve, publish, sleep, repeat.
///
/// Runs as a single task that owns all loop state, so resolve completions and
/// timer firings are serialized without locks. The task only keeps a weak
/// reference to the cluster and stops as soon as the cluster is gone or the
/// shutdown token fires.
pub(crate) struct ResolutionLoop<C: ConnectionFactory> {
    cluster: Weak<ClusterShared<C>>,
    resolver: Arc<dyn DnsResolver>,
    registry: Arc<dyn HostSetRegistry>,
    hostname: Arc<str>,
    port: u16,
    family: DnsLookupFamily,
    refresh_interval: Duration,
    active_query: Option<ActiveQuery>,
    current_resolved_address: Option<SocketAddr>,
    on_initialized: Option<InitializeCallback>,
    shutdown: CancellationToken,
}

impl<C: ConnectionFactory> ResolutionLoop<C> {
    pub(crate) fn new(
        cluster: &Arc<ClusterShared<C>>,
        resolver: Arc<dyn DnsResolver>,
        registry: Arc<dyn HostSetRegistry>,
        on_initialized: InitializeCallback,
        shutdown: CancellationToken,
    ) -> Self {
        let settings = cluster.settings();
        Self {
            cluster: Arc::downgrade(cluster),
            resolver,
            registry,
            hostname: Arc::from(settings.hostname.as_str()),
            port: settings.port,
            family: settings.dns_lookup_family,
            refresh_interval: settings.refresh_interval,
            active_query: None,
            current_resolved_address: None,
            on_initialized: Some(on_initialized),
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        loop {
            if !self.start_resolve() {
                break;
            }

            let addresses = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                addresses = self.wait_for_query() => addresses,
            };

            let (broadcast, new_host) = match self.on_resolve_complete(addresses) {
                CycleOutcome::ClusterGone => break,
                CycleOutcome::Unchanged => (None, None),
                CycleOutcome::Broadcast {
                    completion,
                    new_host,
                } => (Some(completion), new_host),
            };

            // Every worker must hold an address before the cluster is reported
            // ready and before the host becomes visible to load balancing.
            // Later broadcasts are fire-and-forget.
            if self.on_initialized.is_some() || new_host.is_some() {
                if let Some(completion) = broadcast {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = completion.wait() => {}
                    }
                }
            }

            if let Some(host) = new_host {
                if !self.publish_host(host) {
                    break;
                }
            }

            if self.on_initialized.is_some() {
                self.complete_initialization();
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.refresh_interval) => {}
            }
        }

        if let Some(query) = self.active_query.take() {
            query.cancel();
        }
        debug!(hostname = %self.hostname, "Resolution loop stopped");
    }

    fn start_resolve(&mut self) -> bool {
        let Some(cluster) = self.cluster.upgrade() else {
            return false;
        };

        debug!(hostname = %self.hostname, "Starting async DNS resolution");
        cluster.stats().inc_update_attempt();

        self.active_query = Some(ActiveQuery::spawn(
            Arc::clone(&self.resolver),
            Arc::clone(&self.hostname),
            self.family,
        ));
        true
    }

    async fn wait_for_query(&mut self) -> Vec<IpAddr> {
        match self.active_query.as_mut() {
            Some(query) => query.wait().await,
            None => Vec::new(),
        }
    }

    fn on_resolve_complete(&mut self, addresses: Vec<IpAddr>) -> CycleOutcome<C> {
        self.active_query = None;

        let Some(cluster) = self.cluster.upgrade() else {
            return CycleOutcome::ClusterGone;
        };

        debug!(
            hostname = %self.hostname,
            results = addresses.len(),
            "Async DNS resolution complete"
        );
        cluster.stats().inc_update_success();

        let Some(first) = addresses.first() else {
            debug!(hostname = %self.hostname, "No addresses returned, keeping previous address");
            return CycleOutcome::Unchanged;
        };
        let new_address = SocketAddr::new(*first, self.port);

        let (host, new_host) = match cluster.logical_host() {
            Some(host) => (host, None),
            None => {
                let host = self.create_logical_host(&cluster, first);
                (Arc::clone(&host), Some(host))
            }
        };

        if self.current_resolved_address == Some(new_address) {
            return CycleOutcome::Unchanged;
        }

        info!(
            cluster = %cluster.settings().cluster_name,
            hostname = %self.hostname,
            previous = ?self.current_resolved_address,
            address = %new_address,
            "Resolved address changed"
        );

        self.current_resolved_address = Some(new_address);
        cluster.publish_resolved_address(new_address);
        host.set_health_check_address(new_address);
        cluster.stats().inc_update_address_changed();

        let completion = cluster.tls().run_on_all_threads(move |data| {
            data.current_resolved_address = Some(new_address);
        });
        CycleOutcome::Broadcast {
            completion,
            new_host,
        }
    }

    fn create_logical_host(&self, cluster: &Arc<ClusterShared<C>>, resolved_ip: &IpAddr) -> Arc<LogicalHost<C>> {
        Arc::new(LogicalHost::new(
            Arc::clone(cluster.settings()),
            resolved_ip,
            cluster.tls().clone(),
            Arc::clone(cluster.connector()),
        ))
    }

    /// Makes a freshly created host visible on the cluster and registers it
    /// with the host set. Runs once per cluster. Returns false when the
    /// cluster is gone.
    fn publish_host(&self, host: Arc<LogicalHost<C>>) -> bool {
        let Some(cluster) = self.cluster.upgrade() else {
            return false;
        };

        cluster.set_logical_host(Arc::clone(&host));

        let settings = cluster.settings();
        let registered: Arc<dyn Host> = host.clone();
        self.registry
            .register_host(registered, &settings.locality_lb_endpoints);

        info!(
            cluster = %settings.cluster_name,
            hostname = %self.hostname,
            placeholder = %host.address(),
            priority = settings.locality_lb_endpoints.priority,
            "Logical host created"
        );
        true
    }

    fn complete_initialization(&mut self) {
        let Some(on_initialized) = self.on_initialized.take() else {
            return;
        };
        if let Some(cluster) = self.cluster.upgrade() {
            cluster.set_phase(ClusterPhase::Active);
            info!(
                cluster = %cluster.settings().cluster_name,
                resolved = self.current_resolved_address.is_some(),
                "Cluster initialization complete"
            );
        }
        on_initialized();
    }
}

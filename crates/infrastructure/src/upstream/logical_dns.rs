use arc_swap::ArcSwapOption;
use ferrous_lb_application::ports::{
    ClusterIntrospection, ConnectionFactory, DnsResolver, Host, HostSetRegistry,
};
use ferrous_lb_domain::{
    ClusterConfig, ClusterPhase, ClusterStatus, ConfigError, DomainError, LogicalDnsSettings,
};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::logical_host::{LogicalHost, PerThreadHostData};
use super::resolution::ResolutionLoop;
use super::stats::ClusterStats;
use crate::worker::{Slot, WorkerPool};

/// State shared between the cluster handle, its resolution loop and the
/// administrative view.
pub(crate) struct ClusterShared<C: ConnectionFactory> {
    settings: Arc<LogicalDnsSettings>,
    stats: ClusterStats,
    tls: Slot<PerThreadHostData>,
    connector: Arc<C>,
    logical_host: OnceLock<Arc<LogicalHost<C>>>,
    current_resolved_address: ArcSwapOption<SocketAddr>,
    phase: watch::Sender<ClusterPhase>,
}

impl<C: ConnectionFactory> ClusterShared<C> {
    pub(crate) fn settings(&self) -> &Arc<LogicalDnsSettings> {
        &self.settings
    }

    pub(crate) fn stats(&self) -> &ClusterStats {
        &self.stats
    }

    pub(crate) fn tls(&self) -> &Slot<PerThreadHostData> {
        &self.tls
    }

    pub(crate) fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    pub(crate) fn logical_host(&self) -> Option<Arc<LogicalHost<C>>> {
        self.logical_host.get().cloned()
    }

    pub(crate) fn set_logical_host(&self, host: Arc<LogicalHost<C>>) {
        if self.logical_host.set(host).is_err() {
            warn!(cluster = %self.settings.cluster_name, "Logical host already exists, keeping the original");
        }
    }

    pub(crate) fn publish_resolved_address(&self, address: SocketAddr) {
        self.current_resolved_address.store(Some(Arc::new(address)));
    }

    pub(crate) fn set_phase(&self, phase: ClusterPhase) {
        self.phase.send_replace(phase);
    }

    fn current_resolved_address(&self) -> Option<SocketAddr> {
        self.current_resolved_address.load_full().map(|address| *address)
    }
}

impl<C: ConnectionFactory> ClusterIntrospection for ClusterShared<C> {
    fn name(&self) -> &str {
        &self.settings.cluster_name
    }

    fn status(&self) -> ClusterStatus {
        ClusterStatus {
            name: self.settings.cluster_name.clone(),
            hostname: self.settings.hostname.clone(),
            port: self.settings.port,
            phase: *self.phase.borrow(),
            resolved_address: self.current_resolved_address(),
            health_check_address: self
                .logical_host
                .get()
                .and_then(|host| host.health_check_address()),
            stats: self.stats.snapshot(),
        }
    }
}

/// A cluster whose single host is found by periodically resolving a hostname.
///
/// Construction validates the configuration and allocates the per-worker
/// address slot; [`initialize`](Self::initialize) starts the resolution loop
/// on the current tokio runtime. Dropping the cluster cancels any query in
/// flight before the shared state goes away.
pub struct LogicalDnsCluster<C: ConnectionFactory> {
    shared: Arc<ClusterShared<C>>,
    resolver: Arc<dyn DnsResolver>,
    registry: Arc<dyn HostSetRegistry>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<C: ConnectionFactory> LogicalDnsCluster<C> {
    pub fn new(
        config: &ClusterConfig,
        resolver: Arc<dyn DnsResolver>,
        registry: Arc<dyn HostSetRegistry>,
        workers: &WorkerPool,
        connector: Arc<C>,
    ) -> Result<Self, ConfigError> {
        let settings = config.logical_dns_settings()?;

        debug!(
            cluster = %settings.cluster_name,
            hostname = %settings.hostname,
            port = settings.port,
            family = ?settings.dns_lookup_family,
            refresh_interval = ?settings.refresh_interval,
            "Logical DNS cluster configured"
        );

        let tls = workers.allocate_slot(PerThreadHostData::default);
        let (phase, _) = watch::channel(ClusterPhase::Initializing);

        Ok(Self {
            shared: Arc::new(ClusterShared {
                settings: Arc::new(settings),
                stats: ClusterStats::new(),
                tls,
                connector,
                logical_host: OnceLock::new(),
                current_resolved_address: ArcSwapOption::empty(),
                phase,
            }),
            resolver,
            registry,
            shutdown: CancellationToken::new(),
            task: None,
        })
    }

    /// Starts the resolution loop. `on_complete` runs exactly once, after the
    /// first resolution cycle, whether or not it produced an address.
    pub fn initialize<F>(&mut self, on_complete: F) -> Result<(), DomainError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.task.is_some() {
            warn!(cluster = %self.name(), "Cluster already initialized");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainError::WorkerPool(format!("no tokio runtime for resolution loop: {}", e)))?;

        let resolution = ResolutionLoop::new(
            &self.shared,
            Arc::clone(&self.resolver),
            Arc::clone(&self.registry),
            Box::new(on_complete),
            self.shutdown.child_token(),
        );
        self.task = Some(runtime.spawn(resolution.run()));

        info!(
            cluster = %self.name(),
            hostname = %self.shared.settings.hostname,
            "Logical DNS cluster initializing"
        );
        Ok(())
    }

    /// Waits until the first resolution cycle has finished.
    pub async fn wait_initialized(&self) {
        let mut phase = self.shared.phase.subscribe();
        let _ = phase
            .wait_for(|phase| *phase != ClusterPhase::Initializing)
            .await;
    }

    pub fn name(&self) -> &str {
        &self.shared.settings.cluster_name
    }

    pub fn settings(&self) -> &LogicalDnsSettings {
        &self.shared.settings
    }

    pub fn phase(&self) -> ClusterPhase {
        *self.shared.phase.borrow()
    }

    pub fn stats(&self) -> &ClusterStats {
        &self.shared.stats
    }

    /// The single logical host, once the first address has been resolved.
    pub fn logical_host(&self) -> Option<Arc<LogicalHost<C>>> {
        self.shared.logical_host()
    }

    pub fn current_resolved_address(&self) -> Option<SocketAddr> {
        self.shared.current_resolved_address()
    }

    pub fn status(&self) -> ClusterStatus {
        self.shared.status()
    }

    /// Read-only view for administrative output.
    pub fn introspection(&self) -> Arc<dyn ClusterIntrospection> {
        self.shared.clone()
    }

    /// Stops the resolution loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.begin_teardown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!(cluster = %self.name(), "Logical DNS cluster stopped");
    }

    fn begin_teardown(&self) {
        self.shared.set_phase(ClusterPhase::TearingDown);
        self.shutdown.cancel();
    }
}

impl<C: ConnectionFactory> Drop for LogicalDnsCluster<C> {
    fn drop(&mut self) {
        self.begin_teardown();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

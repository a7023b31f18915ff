use ferrous_lb_application::ports::ClusterIntrospection;
use ferrous_lb_application::use_cases::GetClustersUseCase;
use ferrous_lb_domain::ClusterConfig;
use ferrous_lb_infrastructure::dns::SystemDnsResolver;
use ferrous_lb_infrastructure::upstream::{LogicalDnsCluster, PrioritySet, TcpConnectionFactory};
use ferrous_lb_infrastructure::worker::WorkerPool;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Owns every configured cluster and the host registry they publish to.
pub struct ClusterManager {
    clusters: Vec<LogicalDnsCluster<TcpConnectionFactory>>,
    registry: Arc<PrioritySet>,
}

impl ClusterManager {
    pub fn build(configs: &[ClusterConfig], workers: &WorkerPool) -> anyhow::Result<Self> {
        let registry = Arc::new(PrioritySet::new());
        let connector = Arc::new(TcpConnectionFactory::new());

        let mut clusters = Vec::with_capacity(configs.len());
        for config in configs {
            let resolver = Arc::new(SystemDnsResolver::new(Duration::from_millis(
                config.dns_resolve_timeout_ms,
            )));
            let cluster = LogicalDnsCluster::new(
                config,
                resolver,
                registry.clone(),
                workers,
                Arc::clone(&connector),
            )?;
            clusters.push(cluster);
        }

        Ok(Self { clusters, registry })
    }

    /// Starts every cluster and waits for each one's first resolution cycle.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        for cluster in &mut self.clusters {
            let name = cluster.name().to_string();
            cluster.initialize(move || info!(cluster = %name, "Cluster ready"))?;
        }

        join_all(self.clusters.iter().map(|cluster| cluster.wait_initialized())).await;

        info!(
            clusters = self.clusters.len(),
            hosts = self.registry.host_count(),
            "All clusters initialized"
        );
        Ok(())
    }

    pub fn get_clusters_use_case(&self) -> GetClustersUseCase {
        let views: Vec<Arc<dyn ClusterIntrospection>> =
            self.clusters.iter().map(|cluster| cluster.introspection()).collect();
        GetClustersUseCase::new(views)
    }

    pub async fn shutdown(self) {
        join_all(self.clusters.into_iter().map(|cluster| cluster.shutdown())).await;
        info!("All clusters stopped");
    }
}

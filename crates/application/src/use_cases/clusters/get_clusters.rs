use ferrous_lb_domain::{ClusterStatus, DomainError};
use std::sync::Arc;
use tracing::instrument;

use crate::ports::ClusterIntrospection;

/// Use case for the administrative cluster listing.
pub struct GetClustersUseCase {
    clusters: Vec<Arc<dyn ClusterIntrospection>>,
}

impl GetClustersUseCase {
    pub fn new(clusters: Vec<Arc<dyn ClusterIntrospection>>) -> Self {
        Self { clusters }
    }

    /// Status of every cluster, sorted by name.
    #[instrument(skip(self))]
    pub fn get_all(&self) -> Vec<ClusterStatus> {
        let mut statuses: Vec<ClusterStatus> =
            self.clusters.iter().map(|cluster| cluster.status()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Status of the cluster called `name`.
    ///
    /// # Returns
    ///
    /// * `Ok(ClusterStatus)` - If the cluster exists
    /// * `Err(DomainError::NotFound)` - Otherwise
    #[instrument(skip(self))]
    pub fn get_by_name(&self, name: &str) -> Result<ClusterStatus, DomainError> {
        self.clusters
            .iter()
            .find(|cluster| cluster.name() == name)
            .map(|cluster| cluster.status())
            .ok_or_else(|| DomainError::NotFound(format!("cluster '{}'", name)))
    }
}

use dashmap::DashMap;
use ferrous_lb_application::ports::{Host, HostSetRegistry};
use ferrous_lb_domain::LocalityLbEndpoints;
use std::sync::Arc;
use tracing::info;

/// Hosts grouped by priority, as consumed by load balancing.
#[derive(Default)]
pub struct PrioritySet {
    host_sets: DashMap<u32, Vec<Arc<dyn Host>>>,
}

impl PrioritySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts registered at `priority`.
    pub fn hosts(&self, priority: u32) -> Vec<Arc<dyn Host>> {
        self.host_sets
            .get(&priority)
            .map(|hosts| hosts.clone())
            .unwrap_or_default()
    }

    /// Hosts of `cluster_name` across all priorities.
    pub fn hosts_for_cluster(&self, cluster_name: &str) -> Vec<Arc<dyn Host>> {
        self.host_sets
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|host| host.cluster_name() == cluster_name)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn priorities(&self) -> Vec<u32> {
        let mut priorities: Vec<u32> = self.host_sets.iter().map(|entry| *entry.key()).collect();
        priorities.sort_unstable();
        priorities
    }

    pub fn host_count(&self) -> usize {
        self.host_sets.iter().map(|entry| entry.value().len()).sum()
    }
}

impl HostSetRegistry for PrioritySet {
    fn register_host(&self, host: Arc<dyn Host>, endpoints: &LocalityLbEndpoints) {
        info!(
            cluster = host.cluster_name(),
            hostname = host.hostname(),
            priority = endpoints.priority,
            region = %endpoints.locality.region,
            zone = %endpoints.locality.zone,
            "Host registered"
        );
        self.host_sets
            .entry(endpoints.priority)
            .or_default()
            .push(host);
    }
}

use ferrous_lb_domain::ClusterStatus;

/// Read-only administrative view of a cluster
pub trait ClusterIntrospection: Send + Sync {
    fn name(&self) -> &str;

    fn status(&self) -> ClusterStatus;
}

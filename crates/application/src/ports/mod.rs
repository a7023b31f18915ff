mod cluster_introspection;
mod connection;
mod dispatcher;
mod dns_resolver;
mod host_set;

pub use cluster_introspection::ClusterIntrospection;
pub use connection::ConnectionFactory;
pub use dispatcher::Dispatcher;
pub use dns_resolver::DnsResolver;
pub use host_set::{Host, HostSetRegistry};

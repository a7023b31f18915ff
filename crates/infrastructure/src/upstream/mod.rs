pub mod connection;
pub mod logical_dns;
pub mod logical_host;
pub mod priority_set;
mod resolution;
pub mod stats;

pub use connection::{TcpConnectionFactory, UpstreamConnection};
pub use logical_dns::LogicalDnsCluster;
pub use logical_host::{CreateConnectionData, LogicalHost, PerThreadHostData};
pub use priority_set::PrioritySet;
pub use stats::ClusterStats;

pub mod cluster;

pub use cluster::{ClusterResponse, ClusterStatsResponse};

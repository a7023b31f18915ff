pub mod clusters;

pub use clusters::ClusterManager;

mod mock_clusters;

pub use mock_clusters::MockCluster;

mod get_clusters;

pub use get_clusters::GetClustersUseCase;

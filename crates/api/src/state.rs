use ferrous_lb_application::use_cases::GetClustersUseCase;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub get_clusters: Arc<GetClustersUseCase>,
}

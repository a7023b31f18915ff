use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use ferrous_lb_domain::DomainError;
use tracing::{debug, error};

use crate::{dto::ClusterResponse, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clusters", get(get_all_clusters))
        .route("/clusters/{name}", get(get_cluster))
}

async fn get_all_clusters(State(state): State<AppState>) -> Json<Vec<ClusterResponse>> {
    let clusters: Vec<ClusterResponse> = state
        .get_clusters
        .get_all()
        .into_iter()
        .map(ClusterResponse::from)
        .collect();
    debug!(count = clusters.len(), "Clusters retrieved");
    Json(clusters)
}

async fn get_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterResponse>, (StatusCode, String)> {
    match state.get_clusters.get_by_name(&name) {
        Ok(status) => Ok(Json(status.into())),
        Err(DomainError::NotFound(msg)) => Err((StatusCode::NOT_FOUND, format!("{} not found", msg))),
        Err(e) => {
            error!(error = %e, cluster = %name, "Failed to retrieve cluster");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

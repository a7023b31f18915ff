use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

/// Creates all admin routes with state
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(handlers::clusters::routes())
        .with_state(state)
}

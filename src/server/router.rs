use axum::Router;
use axum::routing::{get, post};

use super::AppState;
use super::handlers::{ask_handler, health_handler, root_handler};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .with_state(state)
}

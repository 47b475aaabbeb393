//! Route table and middleware.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/dashboard", get(handlers::dashboard))
        .route("/api/cities", get(handlers::api_cities))
        .route("/api/dashboard", get(handlers::api_dashboard))
        .route("/api/health", get(handlers::api_health))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;
use tracing::error;

use crate::dashboard::view;
use crate::session::{Session, ViewState};
use crate::state::AppState;

const MAX_CITY_LEN: usize = 100;

/// Query parameters for the dashboard pages.
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default, deserialize_with = "empty_string_as_none_str")]
    pub city: Option<String>,
}

fn empty_string_as_none_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(s.to_string())),
    }
}

fn render_template(
    tera: &tera::Tera,
    template: &str,
    context: &Context,
) -> Result<Html<String>, (StatusCode, &'static str)> {
    tera.render(template, context).map(Html).map_err(|e| {
        error!("Template render error for '{}': {}", template, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Render error")
    })
}

/// Runs one select -> load cycle for the requested (or default) city.
async fn run_session(state: &AppState, query: CityQuery) -> Session {
    let dashboard = &state.dashboard;
    let mut session = dashboard.start_session().await;
    let city: String = match query.city {
        Some(city) => city.chars().take(MAX_CITY_LEN).collect(),
        None => session.selected_city().to_string(),
    };
    dashboard.select(&mut session, &city).await;
    session
}

/// GET / - Monitoring network overview with map markers.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cities = state.dashboard.cities().await;
    let markers = state.dashboard.markers().await;

    let mut context = Context::new();
    context.insert("cities", &cities);
    context.insert("markers", &markers);

    render_template(&state.tera, "home.html", &context)
}

/// GET /dashboard - Station analytics for one city.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> impl IntoResponse {
    let cities = state.dashboard.cities().await;
    let session = run_session(&state, query).await;

    let mut context = Context::new();
    context.insert("cities", &cities);
    context.insert("selected_city", session.selected_city());
    context.insert("status", session.state().name());
    context.insert("view", &view(&session));
    if let ViewState::Error { message, .. } = session.state() {
        context.insert("message", message);
    }

    render_template(&state.tera, "dashboard.html", &context)
}

/// GET /api/cities - Station list as JSON.
pub async fn api_cities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.cities().await)
}

/// GET /api/dashboard - Session state and derived values as JSON.
pub async fn api_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> impl IntoResponse {
    let session = run_session(&state, query).await;
    let view = view(&session);

    Json(serde_json::json!({
        "state": session.state(),
        "view": view,
    }))
}

/// GET /api/health - Backend reachability.
pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend = state.dashboard.health().await;
    let status = if backend.is_some() { "ok" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "backend": backend,
    }))
}

//! REST endpoints for the dashboard.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use super::presenter::DashboardPresenter;
use crate::error::DashboardError;

/// Shared state for dashboard routes.
#[derive(Clone)]
pub struct DashboardRouteState {
    pub presenter: Arc<DashboardPresenter>,
}

/// Build the dashboard REST routes.
pub fn dashboard_routes(presenter: Arc<DashboardPresenter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/automation/toggle", post(toggle_automation))
        .route("/api/stats/reset", post(reset_stats))
        .with_state(DashboardRouteState { presenter })
        .layer(cors)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "linkedin-automator"
    }))
}

/// GET /api/dashboard
///
/// Latest polled view. Does not hit the store.
async fn get_dashboard(State(state): State<DashboardRouteState>) -> impl IntoResponse {
    Json(state.presenter.view().await)
}

/// POST /api/automation/toggle
///
/// 409 while a previous toggle is still writing.
async fn toggle_automation(State(state): State<DashboardRouteState>) -> Response {
    match state.presenter.toggle().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/stats/reset
async fn reset_stats(State(state): State<DashboardRouteState>) -> Response {
    match state.presenter.reset().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: DashboardError) -> Response {
    let status = match err {
        DashboardError::ToggleInFlight => StatusCode::CONFLICT,
        DashboardError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

//! HTTP route definitions for the three listeners

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::orchestrator::MatchStatus;
use crate::util::time::uptime_secs;
use crate::ws::handler::game_ws_handler;
use crate::ws::signaling::signaling_ws_handler;

/// Router for the game WebSocket listener
pub fn build_game_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(game_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

/// Router for the signaling WebSocket listener
pub fn build_signaling_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(signaling_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

/// Router for the HTTP API listener
pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

/// CORS configuration - supports multiple origins (comma-separated in CLIENT_ORIGIN)
fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_players: usize,
    matches: Vec<MatchStatus>,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.orchestrator.match_count(),
        active_players: state.orchestrator.player_count(),
        matches: state.orchestrator.match_statuses(),
    })
}

//! HTTP route definitions

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::game::killlog::KILL_LOG_CAPACITY;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::KillLogEntry;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_handler))
        .route("/killlog", get(kill_log_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_arenas: usize,
    active_players: usize,
    connected_sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_arenas: state.arena_registry.active_arenas(),
        active_players: state.arena_registry.total_players(),
        connected_sessions: state.sessions.connected_players(),
    })
}

// ============================================================================
// Kill feed endpoint
// ============================================================================

#[derive(Deserialize)]
struct KillLogQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct KillLogResponse {
    entries: Vec<KillLogEntry>,
}

/// Recent kills, newest first
async fn kill_log_handler(
    State(state): State<AppState>,
    Query(query): Query<KillLogQuery>,
) -> Result<Json<KillLogResponse>, AppError> {
    let limit = query.limit.unwrap_or(50);
    if limit == 0 || limit > KILL_LOG_CAPACITY {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            KILL_LOG_CAPACITY
        )));
    }

    Ok(Json(KillLogResponse {
        entries: state.kill_log.recent(limit),
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

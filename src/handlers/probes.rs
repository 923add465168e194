use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;
use crate::flags::FlagSnapshot;

/// GET /health - liveness only, never touches the database.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /ready
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.ready().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
        }
    }
}

/// GET /_flags
pub async fn flags(State(state): State<AppState>) -> Json<FlagSnapshot> {
    Json(FlagSnapshot::clone(&state.flags.current()))
}

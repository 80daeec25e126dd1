use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "curriculo-api"
    }))
}

/// GET /api/status
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "environment": state.config.environment.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::ats::handlers;
use crate::config::{Config, Environment};
use crate::state::AppState;

/// Multipart framing allowance on top of the file size limit, so oversized files
/// reach the explicit size check and get a readable 413.
const MULTIPART_SLACK_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .pipeline
        .max_upload_bytes
        .saturating_add(MULTIPART_SLACK_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/status", get(health::status_handler))
        // ATS analysis
        .route(
            "/api/ats-analyze-file",
            post(handlers::handle_analyze_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/ats-analyze-data", post(handlers::handle_analyze_data))
        .with_state(state)
}

/// Permissive locally; restricted to `ALLOWED_ORIGINS` when deployed.
pub fn cors_layer(config: &Config) -> CorsLayer {
    match config.environment {
        Environment::Development => CorsLayer::permissive(),
        Environment::Production => {
            let origins: Vec<HeaderValue> = config
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin '{origin}'");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - Static SPA from the configured directory with index fallback
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/catalog", get(http::http_get_catalog))
        .route(
            "/api/v1/plan",
            get(http::http_get_plan)
                .post(http::http_post_plan)
                .delete(http::http_delete_plan),
        )
        .route("/api/v1/plan/export", get(http::http_export_plan))
        .route("/api/v1/plan/days/:day/export", get(http::http_export_day))
        .route("/api/v1/plan/exam", get(http::http_get_exam))
        .route(
            "/api/v1/credential",
            get(http::http_get_credential)
                .put(http::http_put_credential)
                .delete(http::http_delete_credential),
        )
        .route("/api/v1/credential/validate", post(http::http_post_validate_credential))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

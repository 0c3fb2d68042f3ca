//! Router assembly: page routes, JSON health, static files, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod pages;

/// Build the application router with:
/// - Landing page at `/`
/// - One page per question at `/questions/{index}` (GET renders, POST interacts)
/// - Review and submission at `/submit`
/// - JSON health at `/api/v1/health`
/// - Static assets (stylesheet, logo) from `static_dir`
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(pages::landing))
        .route(
            "/questions/:index",
            get(pages::question_page).post(pages::question_action),
        )
        .route("/submit", get(pages::review).post(pages::submit))
        .route("/api/v1/health", get(http::http_health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(ServeDir::new(static_dir))
}

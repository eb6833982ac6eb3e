//! Route configuration and setup

use crate::constants::{HEALTH_LIVE_PATH, HEALTH_READY_PATH, WEBHOOK_PATH};
use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use courier_core::Config;
use courier_infra::request_id_middleware;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    tracing::info!(
        webhook_body_limit_bytes = config.webhook_body_limit_bytes(),
        "Routes configured"
    );
    build_router(state, config.webhook_body_limit_bytes())
}

/// Assemble the router. Split from [`setup_routes`] so tests can mount it without a full config.
pub fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handlers::webhook::receive_webhook))
        .route(HEALTH_LIVE_PATH, get(handlers::health::liveness_check))
        .route(HEALTH_READY_PATH, get(handlers::health::readiness_check))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}

//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod caller;
pub mod error;
pub mod health;
pub mod lease;
pub mod metric;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::pipeline::PipelineExecutor;
use crate::store::Store;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub executor: Arc<PipelineExecutor>,
    pub lease_timeout: Duration,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Metric endpoints
        .route("/metric/create", post(metric::create_metric))
        .route("/metric/status/batch", post(metric::batch_status))
        .route("/metric/{id}", get(metric::get_metric))
        .route("/metric/{id}/refresh", post(metric::refresh))
        .route("/metric/{id}/regenerate", post(metric::regenerate))
        .route("/metric/{id}/progress", get(metric::get_progress))
        .route("/metric/{id}/status", get(metric::get_status))
        .route("/metric/{id}/steps", get(metric::get_steps))
        // Edit lease endpoints
        .route("/team/create", post(lease::create_team))
        .route("/team/{id}/lease/check", post(lease::check))
        .route("/team/{id}/lease/acquire", post(lease::acquire))
        .route("/team/{id}/lease/heartbeat", post(lease::heartbeat))
        .route("/team/{id}/lease/release", post(lease::release))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

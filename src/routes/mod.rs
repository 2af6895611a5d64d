//! HTTP handlers of the ops surface.
//!
//! - `health`: liveness, readiness, metrics and build information
//! - `sync`: sync scheduler status and manual trigger

pub mod health;
pub mod sync;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/sync/status", get(sync::sync_status))
        .route("/sync/trigger", post(sync::trigger_sync))
        .with_state(state)
}

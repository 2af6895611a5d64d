use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    types::{SchedulerState, SyncStatus},
};

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub storage_roots: Vec<String>,
    pub catalog_size: i64,
}

pub async fn sync_status(State(state): State<AppState>) -> AppResult<Json<SyncStatusResponse>> {
    let catalog_size: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos").fetch_one(&state.db).await?;
    let status = state.sync_status.read().await.clone();
    Ok(Json(SyncStatusResponse { status, storage_roots: state.config.storage.roots.clone(), catalog_size }))
}

// Starts the next pass now instead of waiting for the interval to elapse.
// The status lock is held across the notify so the scheduler cannot switch to
// Running in between; it discards stale triggers once it holds Running.
pub async fn trigger_sync(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = state.sync_status.read().await;
    match status.state {
        SchedulerState::Running => Err(AppError::Conflict("a sync pass is already running".into())),
        SchedulerState::Stopped => Err(AppError::ServiceUnavailable("sync scheduler is stopped".into())),
        SchedulerState::Idle => {
            state.sync_trigger.notify_one();
            tracing::info!("Manual sync pass requested");
            Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "accepted" }))))
        }
    }
}

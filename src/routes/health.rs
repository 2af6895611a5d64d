use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Liveness check; does not touch the catalog
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness check: checks catalog DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let counters: [(&str, &str, &str, u64); 10] = [
        ("photosync_passes_started", "Sync passes started", "counter", m.passes_started as u64),
        ("photosync_passes_completed", "Sync passes completed", "counter", m.passes_completed as u64),
        ("photosync_passes_failed", "Sync passes failed", "counter", m.passes_failed as u64),
        ("photosync_files_scanned", "Photo files observed by sync passes", "counter", m.files_scanned),
        ("photosync_photos_added", "Photos added to the catalog", "counter", m.photos_added),
        ("photosync_photos_removed", "Photos removed from the catalog", "counter", m.photos_removed),
        ("photosync_file_failures", "Files that failed processing", "counter", m.file_failures),
        ("photosync_compressions_succeeded", "Compressed copies written", "counter", m.compressions_succeeded),
        ("photosync_compressions_failed", "Compressions that failed", "counter", m.compressions_failed),
        ("photosync_uptime_seconds", "Uptime seconds", "gauge", m.uptime_seconds),
    ];
    let mut body = String::new();
    for (name, help, kind, value) in counters {
        body.push_str(&format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"));
    }
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}

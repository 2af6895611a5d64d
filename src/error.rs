use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors returned by the ops handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request clashes with what the sync scheduler is doing right now.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The scheduler has stopped, or no catalog connection could be obtained.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// A catalog query failed. The detail is logged, never sent to the client.
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Conflict(_) => "SYNC_CONFLICT",
            AppError::ServiceUnavailable(_) => "SYNC_UNAVAILABLE",
            AppError::Catalog(_) => "CATALOG_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({ "code": self.code() });
        match self {
            AppError::Catalog(detail) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Catalog query failed: {}", detail);
                error["message"] = json!("The photo catalog could not be queried");
                error["error_id"] = json!(error_id.to_string());
            }
            AppError::Conflict(msg) | AppError::ServiceUnavailable(msg) => {
                error["message"] = json!(msg);
            }
        }

        let body = json!({
            "error": error,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::ServiceUnavailable("no catalog connection available".to_string())
            }
            other => AppError::Catalog(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::types::SyncStatus;

/// The shared state of the ops HTTP surface.
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// The catalog database pool, used for readiness checks and catalog counts.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Status published by the sync scheduler.
    pub sync_status: Arc<RwLock<SyncStatus>>,
    /// Wakes the scheduler for an immediate pass.
    pub sync_trigger: Arc<Notify>,
}

impl AppState {
    pub fn new(
        db: sqlx::SqlitePool,
        config: AppConfig,
        metrics: Metrics,
        sync_status: Arc<RwLock<SyncStatus>>,
        sync_trigger: Arc<Notify>,
    ) -> Self {
        Self { db, config: Arc::new(config), metrics, sync_status, sync_trigger }
    }
}

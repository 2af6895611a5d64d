use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder assigned to photos that do not live below a storage root sub-directory.
pub const UNCATEGORIZED_FOLDER: &str = "uncategorized";

/// Location placeholder for newly discovered photos.
pub const UNSPECIFIED_LOCATION: &str = "unspecified";

/// A catalogued photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub folder: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub file_size_kb: f64,
    /// Serialized metadata blob, opaque to the sync engine.
    pub exif_data: Option<String>,
    pub rating: f64,
}

/// A photo discovered by a sync pass that has no catalog entry yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPhoto {
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub folder: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub file_size_kb: f64,
    pub exif_data: Option<String>,
    pub rating: f64,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub scanned: u64,
    pub added: u64,
    pub removed: u64,
    pub failed: u64,
    pub warnings: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Snapshot served by `/sync/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SchedulerState,
    pub last_report: Option<SyncReport>,
    pub last_error: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self { state: SchedulerState::Idle, last_report: None, last_error: None, next_run_at: None }
    }
}

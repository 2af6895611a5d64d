use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for the sync engine
#[derive(Clone)]
pub struct Metrics {
    pub passes_started: Arc<AtomicUsize>,
    pub passes_completed: Arc<AtomicUsize>,
    pub passes_failed: Arc<AtomicUsize>,
    pub files_scanned: Arc<AtomicU64>,
    pub photos_added: Arc<AtomicU64>,
    pub photos_removed: Arc<AtomicU64>,
    pub file_failures: Arc<AtomicU64>,
    pub compressions_succeeded: Arc<AtomicU64>,
    pub compressions_failed: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            passes_started: Arc::new(AtomicUsize::new(0)),
            passes_completed: Arc::new(AtomicUsize::new(0)),
            passes_failed: Arc::new(AtomicUsize::new(0)),
            files_scanned: Arc::new(AtomicU64::new(0)),
            photos_added: Arc::new(AtomicU64::new(0)),
            photos_removed: Arc::new(AtomicU64::new(0)),
            file_failures: Arc::new(AtomicU64::new(0)),
            compressions_succeeded: Arc::new(AtomicU64::new(0)),
            compressions_failed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_passes_started(&self) {
        self.passes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_passes_completed(&self) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_passes_failed(&self) {
        self.passes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_files_scanned(&self, count: u64) {
        self.files_scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_photos_added(&self, count: u64) {
        self.photos_added.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_photos_removed(&self, count: u64) {
        self.photos_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_file_failures(&self, count: u64) {
        self.file_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_compressions_succeeded(&self) {
        self.compressions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_compressions_failed(&self) {
        self.compressions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes_started: self.passes_started.load(Ordering::Relaxed),
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            passes_failed: self.passes_failed.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            photos_added: self.photos_added.load(Ordering::Relaxed),
            photos_removed: self.photos_removed.load(Ordering::Relaxed),
            file_failures: self.file_failures.load(Ordering::Relaxed),
            compressions_succeeded: self.compressions_succeeded.load(Ordering::Relaxed),
            compressions_failed: self.compressions_failed.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub passes_started: usize,
    pub passes_completed: usize,
    pub passes_failed: usize,
    pub files_scanned: u64,
    pub photos_added: u64,
    pub photos_removed: u64,
    pub file_failures: u64,
    pub compressions_succeeded: u64,
    pub compressions_failed: u64,
    pub uptime_seconds: u64,
}

//! Filesystem-to-catalog reconciliation.
//!
//! A pass scans every storage root, catalogues files that have no record yet,
//! and retires records whose file is gone. Files are processed by tasks gated
//! by a semaphore sized to the host's parallelism; a failure in one file never
//! aborts the pass. All catalog writes of a pass are committed together,
//! removals first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogError, CatalogStore};
use crate::compress::CompressionHandle;
use crate::metadata::{self, MetadataExtractor};
use crate::metrics::Metrics;
use crate::paths::PathResolver;
use crate::scanner::{self, ScanFilter};
use crate::types::{NewPhoto, SyncReport, UNSPECIFIED_LOCATION};

pub mod scheduler;

pub use scheduler::Scheduler;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("file worker limiter closed")]
    Limiter(#[from] AcquireError),
    #[error("sync pass cancelled")]
    Cancelled,
}

/// One unit of scheduled work.
#[async_trait]
pub trait SyncPass: Send + Sync {
    async fn run_pass(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Known,
    Added,
    Failed,
}

/// State shared by all file units of one pass.
struct PassContext {
    catalog: Arc<dyn CatalogStore>,
    resolver: Arc<PathResolver>,
    extractor: Arc<dyn MetadataExtractor>,
    compression: Option<CompressionHandle>,
    observed: Mutex<HashSet<String>>,
    additions: Mutex<Vec<NewPhoto>>,
}

pub struct Reconciler {
    catalog: Arc<dyn CatalogStore>,
    resolver: Arc<PathResolver>,
    extractor: Arc<dyn MetadataExtractor>,
    filter: ScanFilter,
    compression: Option<CompressionHandle>,
    metrics: Metrics,
    concurrency: usize,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        resolver: Arc<PathResolver>,
        extractor: Arc<dyn MetadataExtractor>,
        filter: ScanFilter,
        metrics: Metrics,
    ) -> Self {
        Self {
            catalog,
            resolver,
            extractor,
            filter,
            compression: None,
            metrics,
            concurrency: num_cpus::get().max(1),
        }
    }

    pub fn with_compression(mut self, handle: CompressionHandle) -> Self {
        self.compression = Some(handle);
        self
    }

    /// Overrides the number of files processed at once (host parallelism by default).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs one reconciliation pass.
    ///
    /// Once `cancel` fires no further files are dispatched; files already in
    /// flight finish, nothing is written and [`SyncError::Cancelled`] is returned.
    pub async fn reconcile(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport { started_at: Some(Utc::now()), ..Default::default() };

        info!(roots = self.resolver.roots().len(), "Scanning storage roots for new photos");
        let scan = scanner::scan_roots(self.resolver.roots(), &self.filter, cancel).await;
        report.warnings = scan.warnings.len() as u64;
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let ctx = Arc::new(PassContext {
            catalog: self.catalog.clone(),
            resolver: self.resolver.clone(),
            extractor: self.extractor.clone(),
            compression: self.compression.clone(),
            observed: Mutex::new(HashSet::with_capacity(scan.files.len())),
            additions: Mutex::new(Vec::new()),
        });
        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut units = JoinSet::new();
        let mut cancelled = false;

        for file in scan.files {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = limiter.clone().acquire_owned() => permit?,
            };
            let ctx = ctx.clone();
            units.spawn(async move {
                let outcome = process_file(&ctx, file).await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(UnitOutcome::Failed) => report.failed += 1,
                Ok(UnitOutcome::Known | UnitOutcome::Added) => {}
                Err(e) => {
                    report.failed += 1;
                    error!("File task failed: {}", e);
                }
            }
        }
        self.metrics.add_file_failures(report.failed);

        if cancelled {
            info!("Sync pass cancelled; pending changes discarded");
            return Err(SyncError::Cancelled);
        }

        let observed = std::mem::take(&mut *ctx.observed.lock().unwrap_or_else(PoisonError::into_inner));
        let additions = std::mem::take(&mut *ctx.additions.lock().unwrap_or_else(PoisonError::into_inner));
        report.scanned = observed.len() as u64;
        self.metrics.add_files_scanned(report.scanned);

        let mut deletions = Vec::new();
        for photo in self.catalog.enumerate_all().await? {
            if observed.contains(&photo.file_path) {
                continue;
            }
            // Existence on disk is authoritative; an unreadable answer keeps the record.
            if tokio::fs::try_exists(&photo.file_path).await.unwrap_or(true) {
                continue;
            }
            info!(path = %photo.file_path, "Found catalog entry whose file is gone");
            deletions.push(photo);
        }

        if deletions.is_empty() && additions.is_empty() {
            info!(scanned = report.scanned, "No new or deleted photos found");
        } else {
            if !deletions.is_empty() {
                info!(count = deletions.len(), "Removing catalog entries without files");
                self.catalog.remove_batch(deletions).await?;
            }
            if !additions.is_empty() {
                info!(count = additions.len(), "Adding new photos to the catalog");
                self.catalog.add_batch(additions).await?;
            }
            let saved = self.catalog.save_changes().await?;
            report.added = saved.added;
            report.removed = saved.removed;
            self.metrics.add_photos_added(saved.added);
            self.metrics.add_photos_removed(saved.removed);
            info!(added = saved.added, removed = saved.removed, "Sync complete");
        }

        report.finished_at = Some(Utc::now());
        Ok(report)
    }
}

#[async_trait]
impl SyncPass for Reconciler {
    async fn run_pass(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        self.reconcile(cancel).await
    }
}

async fn process_file(ctx: &PassContext, path: PathBuf) -> UnitOutcome {
    let key = path.to_string_lossy().to_string();
    // Overlapping roots report the same file more than once.
    if !ctx.observed.lock().unwrap_or_else(PoisonError::into_inner).insert(key.clone()) {
        return UnitOutcome::Known;
    }

    match ctx.catalog.find_by_path(&key).await {
        Ok(Some(_)) => return UnitOutcome::Known,
        Ok(None) => {}
        Err(e) => {
            warn!(path = %key, "Catalog lookup failed: {}", e);
            return UnitOutcome::Failed;
        }
    }

    let resolver = ctx.resolver.clone();
    let extractor = ctx.extractor.clone();
    let job_path = path.clone();
    let derived = task::spawn_blocking(move || derive_photo(&job_path, &resolver, extractor.as_ref())).await;

    match derived {
        Ok(Ok(photo)) => {
            ctx.additions.lock().unwrap_or_else(PoisonError::into_inner).push(photo);
            debug!(path = %key, reference = %ctx.resolver.reference_for(&path), "Discovered new photo");
            if let Some(queue) = &ctx.compression {
                queue.enqueue(path);
            }
            UnitOutcome::Added
        }
        Ok(Err(e)) => {
            error!(path = %key, "Failed to read file: {}", e);
            UnitOutcome::Failed
        }
        Err(e) => {
            error!(path = %key, "File processing panicked: {}", e);
            UnitOutcome::Failed
        }
    }
}

/// Builds the catalog record for a file seen for the first time. Blocking.
pub fn derive_photo(
    path: &Path,
    resolver: &PathResolver,
    extractor: &dyn MetadataExtractor,
) -> std::io::Result<NewPhoto> {
    let date = metadata::resolve_file_date(path)?;
    let title = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    Ok(NewPhoto {
        file_path: path.to_string_lossy().to_string(),
        title,
        description: String::new(),
        folder: resolver.folder_for(path),
        location: UNSPECIFIED_LOCATION.to_string(),
        date,
        file_size_kb: metadata::file_size_kb(path),
        exif_data: extractor.extract(path).and_then(|m| m.to_json()),
        rating: 0.0,
    })
}

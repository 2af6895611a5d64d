//! Shared fixtures for the sync engine tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::catalog::{CatalogError, CatalogStore, SaveSummary};
use crate::metadata::{ExtractedMetadata, MetadataExtractor};
use crate::metrics::Metrics;
use crate::paths::PathResolver;
use crate::scanner::ScanFilter;
use crate::sync::Reconciler;
use crate::types::{NewPhoto, PhotoRecord};

/// Writes `len` bytes to `root/rel`, creating parent directories.
pub fn touch(root: &Path, rel: &str, len: usize) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![0u8; len]).unwrap();
    path
}

pub fn path_str(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

/// In-memory catalog recording the order of write operations.
#[derive(Default)]
pub struct MemoryCatalog {
    records: Mutex<Vec<PhotoRecord>>,
    pending: Mutex<(Vec<PhotoRecord>, Vec<NewPhoto>)>,
    next_id: AtomicI64,
    pub fail_saves: AtomicBool,
    pub saves: AtomicUsize,
    pub ops: Mutex<Vec<&'static str>>,
}

impl MemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, path: &str, title: &str) -> PhotoRecord {
        let record = PhotoRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            file_path: path.to_string(),
            title: title.to_string(),
            description: "kept by the API".to_string(),
            folder: "custom".to_string(),
            location: "Paris".to_string(),
            date: Utc::now(),
            file_size_kb: 12.5,
            exif_data: None,
            rating: 4.5,
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn get(&self, path: &str) -> Option<PhotoRecord> {
        self.records.lock().unwrap().iter().find(|r| r.file_path == path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.records.lock().unwrap().iter().map(|r| r.file_path.clone()).collect();
        paths.sort();
        paths
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_by_path(&self, path: &str) -> Result<Option<PhotoRecord>, CatalogError> {
        Ok(self.get(path))
    }

    async fn enumerate_all(&self) -> Result<Vec<PhotoRecord>, CatalogError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn add_batch(&self, mut photos: Vec<NewPhoto>) -> Result<(), CatalogError> {
        self.ops.lock().unwrap().push("add");
        self.pending.lock().unwrap().1.append(&mut photos);
        Ok(())
    }

    async fn remove_batch(&self, mut photos: Vec<PhotoRecord>) -> Result<(), CatalogError> {
        self.ops.lock().unwrap().push("remove");
        self.pending.lock().unwrap().0.append(&mut photos);
        Ok(())
    }

    async fn save_changes(&self) -> Result<SaveSummary, CatalogError> {
        self.ops.lock().unwrap().push("save");
        self.saves.fetch_add(1, Ordering::SeqCst);
        let (removals, additions) = std::mem::take(&mut *self.pending.lock().unwrap());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("database is locked".into()));
        }

        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !removals.iter().any(|d| d.id == r.id));
        let removed = (before - records.len()) as u64;
        let added = additions.len() as u64;
        for p in additions {
            records.push(PhotoRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                file_path: p.file_path,
                title: p.title,
                description: p.description,
                folder: p.folder,
                location: p.location,
                date: p.date,
                file_size_kb: p.file_size_kb,
                exif_data: p.exif_data,
                rating: p.rating,
            });
        }
        Ok(SaveSummary { removed, added })
    }
}

/// Reports only the file size.
pub struct SizeOnlyExtractor;

impl MetadataExtractor for SizeOnlyExtractor {
    fn extract(&self, path: &Path) -> Option<ExtractedMetadata> {
        let size_bytes = fs::metadata(path).ok()?.len();
        Some(ExtractedMetadata { size_bytes, exif: None })
    }
}

/// Panics for one file name, behaves like [`SizeOnlyExtractor`] otherwise.
pub struct PanickingExtractor {
    pub poison: &'static str,
}

impl MetadataExtractor for PanickingExtractor {
    fn extract(&self, path: &Path) -> Option<ExtractedMetadata> {
        if path.file_name().is_some_and(|n| n == self.poison) {
            panic!("corrupt image header in {}", path.display());
        }
        SizeOnlyExtractor.extract(path)
    }
}

/// Tracks how many extractions run at the same time.
pub struct ConcurrencyGauge {
    pub delay: Duration,
    pub current: AtomicUsize,
    pub max_seen: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }
}

impl MetadataExtractor for ConcurrencyGauge {
    fn extract(&self, _path: &Path) -> Option<ExtractedMetadata> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        None
    }
}

pub fn reconciler(
    catalog: Arc<dyn CatalogStore>,
    roots: Vec<PathBuf>,
    extractor: Arc<dyn MetadataExtractor>,
) -> Reconciler {
    Reconciler::new(
        catalog,
        Arc::new(PathResolver::new(roots, "/external")),
        extractor,
        ScanFilter::default(),
        Metrics::new(),
    )
}

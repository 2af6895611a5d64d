use std::{
    fs,
    path::{Path, PathBuf},
};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::task;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Extensions (lowercase, without dot) the scanner reports as photos.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "svg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub path: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanOutcome {
    fn warn(&mut self, path: &Path, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %path.display(), code, "{}", message);
        self.warnings.push(ScanWarning { path: path.to_string_lossy().to_string(), code, message });
    }

    fn merge(&mut self, mut other: ScanOutcome) {
        self.files.append(&mut other.files);
        self.warnings.append(&mut other.warnings);
    }
}

/// Filters applied while walking the storage roots.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub excludes: GlobSet,
    /// Directories never descended into (e.g. the compressed-output folder).
    pub skip_dirs: Vec<PathBuf>,
}

impl ScanFilter {
    pub fn new(exclude_patterns: &[String], skip_dirs: Vec<PathBuf>) -> Result<Self, globset::Error> {
        Ok(Self { excludes: build_globset(exclude_patterns)?, skip_dirs })
    }

    fn skips(&self, path: &Path) -> bool {
        self.skip_dirs.iter().any(|d| d == path) || matches_excludes(path, &self.excludes)
    }
}

/// Lists photo files below every root.
///
/// Each root is walked on its own blocking thread. Roots that are missing or
/// unreadable produce a warning and are skipped; they never fail the scan.
pub async fn scan_roots(roots: &[PathBuf], filter: &ScanFilter, cancel: &CancellationToken) -> ScanOutcome {
    let handles: Vec<_> = roots
        .iter()
        .map(|root| {
            let root = root.clone();
            let filter = filter.clone();
            let cancel = cancel.clone();
            task::spawn_blocking(move || scan_root(&root, &filter, &cancel))
        })
        .collect();

    let mut outcome = ScanOutcome::default();
    for (root, joined) in roots.iter().zip(futures::future::join_all(handles).await) {
        match joined {
            Ok(part) => outcome.merge(part),
            Err(e) => outcome.warn(root, "scan_task_failed", format!("scan task failed: {}", e)),
        }
    }
    outcome
}

/// Walks a single root. Blocking.
pub fn scan_root(root: &Path, filter: &ScanFilter, cancel: &CancellationToken) -> ScanOutcome {
    let mut out = ScanOutcome::default();

    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            out.warn(root, "not_a_directory", "storage root is not a directory");
            return out;
        }
        Err(e) => {
            out.warn(root, "missing_root", format!("storage root is not accessible: {}", e));
            return out;
        }
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !filter.skips(e.path()));

    for entry in walker {
        if cancel.is_cancelled() {
            tracing::debug!(root = %root.display(), "Scan cancelled");
            break;
        }
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    out.files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                out.warn(&path, "read_dir_failed", format!("failed to read entry: {}", e));
            }
        }
    }

    out
}

/// Case-insensitive extension check against [`IMAGE_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()).is_some_and(|ext| {
        let ext = ext.to_ascii_lowercase();
        IMAGE_EXTENSIONS.iter().any(|e| *e == ext)
    })
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        if p.trim().is_empty() {
            continue;
        }
        // Patterns and paths are both compared with forward slashes.
        let norm = p.trim().replace('\\', "/");
        b.add(Glob::new(&norm)?);
    }
    b.build()
}

fn matches_excludes(path: &Path, set: &GlobSet) -> bool {
    if set.is_empty() {
        return false;
    }
    let s = path.to_string_lossy().replace('\\', "/");
    set.is_match(&s)
}

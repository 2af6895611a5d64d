//! Per-file facts derived when a photo is first catalogued.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Tags dropped from the extracted map; vendor blobs are large and unreadable.
const FILTERED_TAGS: &[&str] = &["MakerNote"];

/// Formats the EXIF reader is attempted on.
const EXIF_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "png", "webp"];

/// Best-effort metadata stored as the photo's serialized blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<BTreeMap<String, String>>,
}

impl ExtractedMetadata {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// Source of per-file metadata. Implementations must not fail: any problem
/// reading the file yields `None`.
///
/// Called from blocking threads.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Option<ExtractedMetadata>;
}

/// Reads EXIF tags with `kamadak-exif`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Option<ExtractedMetadata> {
        let size_bytes = fs::metadata(path).ok()?.len();
        let exif = if has_extension(path, EXIF_EXTENSIONS) {
            match read_exif_tags(path) {
                Ok(tags) if !tags.is_empty() => Some(tags),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(path = %path.display(), "No EXIF data: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Some(ExtractedMetadata { size_bytes, exif })
    }
}

fn read_exif_tags(path: &Path) -> Result<BTreeMap<String, String>, exif::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    let mut tags = BTreeMap::new();
    for field in exif.fields() {
        let name = field.tag.to_string();
        if FILTERED_TAGS.contains(&name.as_str()) {
            continue;
        }
        // Primary IFD comes first; thumbnail duplicates must not override it.
        tags.entry(name).or_insert_with(|| field.display_value().with_unit(&exif).to_string());
    }
    Ok(tags)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Capture timestamp of a file.
///
/// Fails only when the file's metadata cannot be read; see [`pick_capture_date`].
pub fn resolve_file_date(path: &Path) -> io::Result<DateTime<Utc>> {
    let meta = fs::metadata(path)?;
    Ok(pick_capture_date([meta.created(), meta.modified(), meta.accessed()], Utc::now()))
}

/// Picks the first plausible timestamp among creation, modification and access
/// time, in that order, falling back to `now`. Some filesystems report
/// epoch-like sentinels (or nothing) for timestamps they do not track.
pub fn pick_capture_date(candidates: [io::Result<SystemTime>; 3], now: DateTime<Utc>) -> DateTime<Utc> {
    candidates
        .into_iter()
        .filter_map(Result::ok)
        .map(DateTime::<Utc>::from)
        .find(is_plausible)
        .unwrap_or(now)
}

pub fn is_plausible(date: &DateTime<Utc>) -> bool {
    date.year() > 2000
}

/// File size in kilobytes rounded to two decimals; 0 when the size cannot be read.
pub fn file_size_kb(path: &Path) -> f64 {
    match fs::metadata(path) {
        Ok(meta) => round2(meta.len() as f64 / 1024.0),
        Err(_) => 0.0,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

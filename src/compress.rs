//! Best-effort JPEG compression of newly discovered photos.
//!
//! Compression never influences cataloguing. Jobs go through a bounded queue
//! served by a single worker so that shutdown can drain outstanding work
//! instead of abandoning detached tasks.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{self, JoinHandle};

use crate::metrics::Metrics;

const COMPRESSIBLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "gif", "tif", "tiff"];

/// Produces a compressed copy of a photo. Blocking.
pub trait Compressor: Send + Sync {
    /// Returns the path of the written copy, or `None` when the file is not
    /// something this compressor handles.
    fn compress(&self, path: &Path) -> anyhow::Result<Option<PathBuf>>;
}

/// Writes `<output_dir>/<stem>_compressed.jpg` using the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    output_dir: PathBuf,
    quality: u8,
}

impl ImageCompressor {
    pub fn new(output_dir: PathBuf, quality: u8) -> Self {
        Self { output_dir, quality: quality.clamp(1, 100) }
    }

    pub fn target_for(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_string_lossy();
        Some(self.output_dir.join(format!("{}_compressed.jpg", stem)))
    }
}

impl Compressor for ImageCompressor {
    fn compress(&self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
        if !path.is_file() {
            return Ok(None);
        }
        let supported = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| COMPRESSIBLE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if !supported {
            return Ok(None);
        }
        let Some(target) = self.target_for(path) else {
            return Ok(None);
        };

        let img = image::open(path).with_context(|| format!("decode {}", path.display()))?;
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("create {}", self.output_dir.display()))?;
        let file = File::create(&target).with_context(|| format!("create {}", target.display()))?;
        let mut writer = BufWriter::new(file);
        // JPEG has no alpha channel
        let rgb = image::DynamicImage::from(img.to_rgb8());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, self.quality))
            .with_context(|| format!("encode {}", target.display()))?;
        Ok(Some(target))
    }
}

/// Cloneable producer side of a [`CompressionQueue`].
#[derive(Clone)]
pub struct CompressionHandle {
    tx: mpsc::Sender<PathBuf>,
}

impl CompressionHandle {
    /// Queues `path` without waiting. Returns `false` if the job was dropped.
    pub fn enqueue(&self, path: PathBuf) -> bool {
        match self.tx.try_send(path) {
            Ok(()) => true,
            Err(TrySendError::Full(path)) => {
                tracing::warn!(path = %path.display(), "Compression queue full, skipping");
                false
            }
            Err(TrySendError::Closed(path)) => {
                tracing::warn!(path = %path.display(), "Compression queue closed, skipping");
                false
            }
        }
    }
}

pub struct CompressionQueue {
    handle: CompressionHandle,
    worker: JoinHandle<()>,
}

impl CompressionQueue {
    pub fn start(compressor: Arc<dyn Compressor>, capacity: usize, metrics: Metrics) -> Self {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                let compressor = compressor.clone();
                let job_path = path.clone();
                match task::spawn_blocking(move || compressor.compress(&job_path)).await {
                    Ok(Ok(Some(out))) => {
                        metrics.inc_compressions_succeeded();
                        tracing::debug!(path = %path.display(), output = %out.display(), "Compressed photo");
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => {
                        metrics.inc_compressions_failed();
                        tracing::warn!(path = %path.display(), "Compression failed: {:#}", e);
                    }
                    Err(e) => {
                        metrics.inc_compressions_failed();
                        tracing::warn!(path = %path.display(), "Compression task failed: {}", e);
                    }
                }
            }
            tracing::debug!("Compression queue drained");
        });
        Self { handle: CompressionHandle { tx }, worker }
    }

    pub fn handle(&self) -> CompressionHandle {
        self.handle.clone()
    }

    /// Closes the queue and waits until every queued job has run.
    ///
    /// Handles cloned from this queue must be dropped first, otherwise the
    /// worker keeps waiting for more jobs.
    pub async fn shutdown(self) {
        let Self { handle, worker } = self;
        drop(handle);
        if let Err(e) = worker.await {
            tracing::error!("Compression worker failed: {}", e);
        }
    }
}

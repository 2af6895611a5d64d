#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::compress::{CompressionQueue, Compressor, ImageCompressor};
    use crate::metrics::Metrics;
    use crate::tests::support::touch;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(24, 16, image::Rgba([200, 40, 40, 128])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_target_path() {
        let compressor = ImageCompressor::new(PathBuf::from("/srv/photos/compressed"), 80);
        assert_eq!(
            compressor.target_for(Path::new("/srv/photos/trip/IMG_0001.png")),
            Some(PathBuf::from("/srv/photos/compressed/IMG_0001_compressed.jpg"))
        );
    }

    #[test]
    fn test_compress_png_to_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_png(temp_dir.path(), "red.png");
        let out_dir = temp_dir.path().join("compressed");
        let compressor = ImageCompressor::new(out_dir.clone(), 70);

        let written = compressor.compress(&source).unwrap().unwrap();

        assert_eq!(written, out_dir.join("red_compressed.jpg"));
        let decoded = image::open(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 16));
    }

    #[test]
    fn test_unsupported_and_missing_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let compressor = ImageCompressor::new(temp_dir.path().join("compressed"), 80);
        let svg = touch(temp_dir.path(), "logo.svg", 10);

        assert!(compressor.compress(&svg).unwrap().is_none());
        assert!(compressor.compress(&temp_dir.path().join("gone.jpg")).unwrap().is_none());
        assert!(!temp_dir.path().join("compressed").exists());
    }

    #[test]
    fn test_corrupt_image_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let compressor = ImageCompressor::new(temp_dir.path().join("compressed"), 80);
        let broken = touch(temp_dir.path(), "broken.jpg", 64);

        assert!(compressor.compress(&broken).is_err());
    }

    struct SlowCompressor {
        done: Mutex<Vec<PathBuf>>,
    }

    impl Compressor for SlowCompressor {
        fn compress(&self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
            std::thread::sleep(Duration::from_millis(5));
            if path.ends_with("bad.jpg") {
                anyhow::bail!("cannot decode");
            }
            self.done.lock().unwrap().push(path.to_path_buf());
            Ok(Some(path.to_path_buf()))
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs() {
        let compressor = Arc::new(SlowCompressor { done: Mutex::new(Vec::new()) });
        let metrics = Metrics::new();
        let queue = CompressionQueue::start(compressor.clone(), 16, metrics.clone());
        let handle = queue.handle();

        for name in ["a.jpg", "b.jpg", "bad.jpg", "c.jpg"] {
            assert!(handle.enqueue(PathBuf::from(name)));
        }
        drop(handle);
        queue.shutdown().await;

        let done = compressor.done.lock().unwrap().clone();
        assert_eq!(done, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg"), PathBuf::from("c.jpg")]);
        let snap = metrics.get_snapshot();
        assert_eq!(snap.compressions_succeeded, 3);
        assert_eq!(snap.compressions_failed, 1);
    }

    struct BlockedCompressor {
        calls: AtomicUsize,
        release: std::sync::Barrier,
    }

    impl Compressor for BlockedCompressor {
        fn compress(&self, _path: &Path) -> anyhow::Result<Option<PathBuf>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.wait();
            }
            Ok(None)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_queue_drops_jobs() {
        let compressor = Arc::new(BlockedCompressor { calls: AtomicUsize::new(0), release: std::sync::Barrier::new(2) });
        let queue = CompressionQueue::start(compressor.clone(), 1, Metrics::new());
        let handle = queue.handle();

        assert!(handle.enqueue(PathBuf::from("first.jpg")));
        // Wait until the worker holds the first job, leaving the single slot empty.
        while compressor.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(handle.enqueue(PathBuf::from("second.jpg")));
        assert!(!handle.enqueue(PathBuf::from("third.jpg")));

        let release = compressor.clone();
        tokio::task::spawn_blocking(move || release.release.wait()).await.unwrap();
        drop(handle);
        queue.shutdown().await;

        assert_eq!(compressor.calls.load(Ordering::SeqCst), 2);
    }
}

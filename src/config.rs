use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage roots in priority order. The first entry is the primary root.
    pub roots: Vec<String>,
    /// URL prefix under which the roots are served to clients.
    pub public_prefix: String,
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub interval_minutes: u64,
    pub error_backoff_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub quality: u8,
    pub folder: String,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub compression: CompressionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn error_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.error_backoff_minutes.saturating_mul(60))
    }
}

impl StorageConfig {
    pub fn root_paths(&self) -> Vec<PathBuf> {
        self.roots.iter().filter(|r| !r.trim().is_empty()).map(PathBuf::from).collect()
    }

    pub fn primary_root(&self) -> Option<PathBuf> {
        self.root_paths().into_iter().next()
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: photosync.toml (in CWD)
        .add_source(::config::File::with_name("photosync").required(false));

    if let Ok(custom_path) = std::env::var("PHOTOSYNC_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence.
    // PHOTOSYNC__STORAGE__ROOTS accepts a comma separated list.
    builder = builder.add_source(
        ::config::Environment::with_prefix("PHOTOSYNC")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("storage.roots")
            .with_list_parse_key("storage.excludes"),
    );

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Storage
    for root in &cfg.storage.roots {
        if root.contains('\0') {
            return Err(anyhow::anyhow!("storage.roots contains a path with null characters"));
        }
        if !root.trim().is_empty() && !Path::new(root).is_absolute() {
            tracing::warn!(root = %root, "Storage root is not absolute; it will be resolved against the working directory");
        }
    }
    let roots = cfg.storage.root_paths();
    for (i, outer) in roots.iter().enumerate() {
        for inner in &roots[i + 1..] {
            if outer.starts_with(inner) || inner.starts_with(outer) {
                tracing::warn!(
                    first = %outer.display(),
                    second = %inner.display(),
                    "Storage roots overlap; files below both are catalogued once"
                );
            }
        }
    }
    if !cfg.storage.public_prefix.starts_with('/') {
        return Err(anyhow::anyhow!("storage.public_prefix must start with '/'"));
    }
    for pat in &cfg.storage.excludes {
        let norm = pat.trim().replace('\\', "/");
        if norm.is_empty() {
            continue;
        }
        if let Err(e) = globset::Glob::new(&norm) {
            return Err(anyhow::anyhow!("invalid storage.excludes pattern {}: {}", pat, e));
        }
    }

    // Sync
    if cfg.sync.interval_minutes == 0 {
        return Err(anyhow::anyhow!("sync.interval_minutes must be > 0"));
    }
    if cfg.sync.error_backoff_minutes == 0 {
        return Err(anyhow::anyhow!("sync.error_backoff_minutes must be > 0"));
    }

    // Compression
    if cfg.compression.quality == 0 || cfg.compression.quality > 100 {
        return Err(anyhow::anyhow!("compression.quality must be in 1..=100"));
    }
    if cfg.compression.queue_capacity == 0 {
        return Err(anyhow::anyhow!("compression.queue_capacity must be > 0"));
    }
    let folder = cfg.compression.folder.trim();
    if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
        return Err(anyhow::anyhow!("compression.folder must be a single directory name"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // On Windows, handle URLs like sqlite:///C:/... by stripping the leading '/'
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

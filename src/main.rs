use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photosync::{
    catalog::SqliteCatalog,
    compress::{CompressionQueue, ImageCompressor},
    config, db,
    metadata::ExifExtractor,
    metrics::Metrics,
    paths::PathResolver,
    routes,
    scanner::ScanFilter,
    state::AppState,
    sync::{Reconciler, Scheduler},
};

const COMPRESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging (stdout + daily file rotation under ./logs)
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "photosync.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Keep the guards alive so the non-blocking writers flush on exit
    let _log_guards = (stdout_guard, file_guard);

    // Load configuration (embedded defaults -> photosync.toml -> env/.env)
    let app_cfg = config::load()?;

    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                let _ = sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA temp_store=MEMORY;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;
    db::init_db(&pool).await?;

    let metrics = Metrics::new();
    let roots = app_cfg.storage.root_paths();
    if roots.is_empty() {
        warn!("No storage roots configured; sync passes will only retire missing files");
    }

    // Compressed copies live under the primary root; the scanner must not pick them up.
    let compressed_dir = app_cfg.storage.primary_root().map(|p| p.join(&app_cfg.compression.folder));
    let compression = match (&compressed_dir, app_cfg.compression.enabled) {
        (Some(dir), true) => {
            let compressor = Arc::new(ImageCompressor::new(dir.clone(), app_cfg.compression.quality));
            Some(CompressionQueue::start(compressor, app_cfg.compression.queue_capacity, metrics.clone()))
        }
        _ => None,
    };

    let filter = ScanFilter::new(&app_cfg.storage.excludes, compressed_dir.into_iter().collect())?;
    let resolver = Arc::new(PathResolver::new(roots, app_cfg.storage.public_prefix.clone()));
    let mut reconciler = Reconciler::new(
        Arc::new(SqliteCatalog::new(pool.clone())),
        resolver,
        Arc::new(ExifExtractor),
        filter,
        metrics.clone(),
    );
    if let Some(queue) = &compression {
        reconciler = reconciler.with_compression(queue.handle());
    }
    info!(concurrency = reconciler.concurrency(), "Sync engine ready");

    let scheduler = Scheduler::new(Arc::new(reconciler), &app_cfg.sync, metrics.clone());
    let state = AppState::new(pool.clone(), app_cfg.clone(), metrics, scheduler.status(), scheduler.trigger());

    let cancel = CancellationToken::new();
    let sync_task = tokio::spawn(scheduler.run(cancel.clone()));

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("PhotoSync listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    // Stop the scheduler first: it owns the last compression handle.
    cancel.cancel();
    if let Err(e) = sync_task.await {
        warn!("Sync scheduler task failed: {}", e);
    }
    if let Some(queue) = compression {
        info!("Draining compression queue");
        if tokio::time::timeout(COMPRESSION_DRAIN_TIMEOUT, queue.shutdown()).await.is_err() {
            warn!("Compression queue did not drain within {:?}", COMPRESSION_DRAIN_TIMEOUT);
        }
    }
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}

use sqlx::SqlitePool;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA temp_store=MEMORY;").execute(pool).await {
        tracing::warn!("Failed to set temp_store: {}", e);
    }

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            folder TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            file_size_kb REAL NOT NULL DEFAULT 0,
            exif_data TEXT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    // Columns added after the first schema version
    for (table, column, ddl) in [("photos", "rating", "REAL NOT NULL DEFAULT 0")] {
        let query = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, ddl);
        if let Err(e) = sqlx::query(&query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if !msg.contains("duplicate") && !msg.contains("already exists") {
                        tracing::error!("Failed to add {} column to {}: {}", column, table, e);
                        return Err(anyhow::anyhow!("Migration failed: {}", e));
                    }
                }
                _ => {
                    tracing::error!("Unexpected error adding {} to {}: {}", column, table, e);
                    return Err(anyhow::anyhow!("Migration failed: {}", e));
                }
            }
        }
    }

    // The unique path index backs find-by-path and rejects duplicate records.
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_photos_file_path ON photos(file_path)")
        .execute(pool)
        .await?;

    let indexes = [
        ("idx_photos_folder", "CREATE INDEX IF NOT EXISTS idx_photos_folder ON photos(folder)"),
        ("idx_photos_date", "CREATE INDEX IF NOT EXISTS idx_photos_date ON photos(date DESC)"),
    ];
    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}

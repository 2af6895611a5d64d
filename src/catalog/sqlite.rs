use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, SqlitePool};
use tokio::sync::Mutex;

use super::{CatalogError, CatalogStore, SaveSummary};
use crate::types::{NewPhoto, PhotoRecord};

// Respect SQLite variable limit (commonly 999). Each inserted row binds a fixed
// number of parameters; cap chunk sizes so a single statement never exceeds it.
const SQLITE_MAX_VARS: usize = 999;
const PHOTO_BINDS_PER_ROW: usize = 9;

#[derive(Default)]
struct PendingChanges {
    removals: Vec<PhotoRecord>,
    additions: Vec<NewPhoto>,
}

/// [`CatalogStore`] backed by the `photos` table.
pub struct SqliteCatalog {
    pool: SqlitePool,
    pending: Mutex<PendingChanges>,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, pending: Mutex::new(PendingChanges::default()) }
    }
}

fn photo_from_row(row: &SqliteRow) -> Result<PhotoRecord, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    let raw_date: String = row.try_get("date")?;
    let date = match DateTime::parse_from_rfc3339(&raw_date) {
        Ok(d) => d.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(id, date = %raw_date, "Unparseable photo date: {}", e);
            DateTime::<Utc>::UNIX_EPOCH
        }
    };
    Ok(PhotoRecord {
        id,
        file_path: row.try_get("file_path")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        folder: row.try_get("folder")?,
        location: row.try_get("location")?,
        date,
        file_size_kb: row.try_get("file_size_kb")?,
        exif_data: row.try_get("exif_data")?,
        rating: row.try_get("rating")?,
    })
}

const SELECT_PHOTO: &str = "SELECT id, file_path, title, description, folder, location, date, file_size_kb, exif_data, rating FROM photos";

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_by_path(&self, path: &str) -> Result<Option<PhotoRecord>, CatalogError> {
        let row = sqlx::query(&format!("{} WHERE file_path = ?1 LIMIT 1", SELECT_PHOTO))
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(photo_from_row).transpose()?)
    }

    async fn enumerate_all(&self) -> Result<Vec<PhotoRecord>, CatalogError> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_PHOTO)).fetch_all(&self.pool).await?;
        let photos = rows.iter().map(photo_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    async fn add_batch(&self, mut photos: Vec<NewPhoto>) -> Result<(), CatalogError> {
        self.pending.lock().await.additions.append(&mut photos);
        Ok(())
    }

    async fn remove_batch(&self, mut photos: Vec<PhotoRecord>) -> Result<(), CatalogError> {
        self.pending.lock().await.removals.append(&mut photos);
        Ok(())
    }

    async fn save_changes(&self) -> Result<SaveSummary, CatalogError> {
        let PendingChanges { removals, additions } = std::mem::take(&mut *self.pending.lock().await);
        let mut summary = SaveSummary::default();
        if removals.is_empty() && additions.is_empty() {
            return Ok(summary);
        }

        let mut txdb = self.pool.begin().await?;

        for chunk in removals.chunks(SQLITE_MAX_VARS) {
            let mut qb = QueryBuilder::new("DELETE FROM photos WHERE id IN (");
            let mut ids = qb.separated(", ");
            for photo in chunk {
                ids.push_bind(photo.id);
            }
            ids.push_unseparated(")");
            summary.removed += qb.build().execute(&mut *txdb).await?.rows_affected();
        }

        let max_rows_per_stmt = (SQLITE_MAX_VARS / PHOTO_BINDS_PER_ROW).max(1);
        for chunk in additions.chunks(max_rows_per_stmt) {
            let mut qb = QueryBuilder::new(
                "INSERT INTO photos (file_path, title, description, folder, location, date, file_size_kb, exif_data, rating) ",
            );
            qb.push_values(chunk, |mut b, p| {
                b.push_bind(&p.file_path)
                    .push_bind(&p.title)
                    .push_bind(&p.description)
                    .push_bind(&p.folder)
                    .push_bind(&p.location)
                    .push_bind(p.date.to_rfc3339())
                    .push_bind(p.file_size_kb)
                    .push_bind(p.exif_data.as_deref())
                    .push_bind(p.rating);
            });
            // A record created concurrently by the API layer wins over ours.
            qb.push(" ON CONFLICT(file_path) DO NOTHING");
            summary.added += qb.build().execute(&mut *txdb).await?.rows_affected();
        }

        txdb.commit().await?;
        Ok(summary)
    }
}

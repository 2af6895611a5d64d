//! Photo catalog persistence.
//!
//! The sync engine talks to the catalog only through [`CatalogStore`]. Writes are
//! staged with [`CatalogStore::remove_batch`] and [`CatalogStore::add_batch`] and
//! become visible in one step when [`CatalogStore::save_changes`] commits them.

use async_trait::async_trait;

use crate::types::{NewPhoto, PhotoRecord};

mod sqlite;

pub use sqlite::SqliteCatalog;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Rows affected by a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub removed: u64,
    pub added: u64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up the record whose `file_path` equals `path` exactly.
    async fn find_by_path(&self, path: &str) -> Result<Option<PhotoRecord>, CatalogError>;

    async fn enumerate_all(&self) -> Result<Vec<PhotoRecord>, CatalogError>;

    /// Stages new records for the next [`CatalogStore::save_changes`].
    async fn add_batch(&self, photos: Vec<NewPhoto>) -> Result<(), CatalogError>;

    /// Stages removals for the next [`CatalogStore::save_changes`].
    async fn remove_batch(&self, photos: Vec<PhotoRecord>) -> Result<(), CatalogError>;

    /// Commits staged removals, then staged additions, atomically.
    ///
    /// Staged changes are discarded whether or not the commit succeeds.
    async fn save_changes(&self) -> Result<SaveSummary, CatalogError>;
}

//! # PhotoSync
//!
//! Keeps a SQLite photo catalog in sync with a set of external storage
//! directories. A background scheduler periodically walks the storage roots,
//! catalogues image files it has not seen before and retires catalog entries
//! whose file has disappeared.
//!
//! ## Core Components
//!
//! - [`scanner`]: lists image files below the storage roots
//! - [`paths`]: derives logical folders and public references from file paths
//! - [`metadata`]: capture dates, sizes and EXIF extraction
//! - [`catalog`]: the catalog store contract and its SQLite implementation
//! - [`sync`]: the reconciliation engine and its scheduler
//! - [`compress`]: bounded background queue for best-effort JPEG compression
//! - [`routes`]: health, metrics and sync status endpoints
//! - [`config`], [`db`], [`error`], [`metrics`], [`state`], [`types`]: plumbing

pub mod catalog;
pub mod compress;
pub mod config;
pub mod db;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod paths;
pub mod routes;
pub mod scanner;
pub mod state;
pub mod sync;
pub mod types;

#[cfg(test)]
mod tests;

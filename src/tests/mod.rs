//! Unit and integration tests for PhotoSync.
//!
//! ## Test Modules
//!
//! - **paths_tests**: Folder and public reference derivation
//! - **scanner_tests**: Storage root walking and filtering
//! - **metadata_tests**: File dates, sizes and EXIF extraction
//! - **sync_tests**: Reconciliation passes against in-memory and SQLite catalogs
//! - **scheduler_tests**: Pass cadence, backoff and shutdown (paused clock)
//! - **compress_tests**: JPEG compression and the background queue
//! - **db_tests**: Schema bootstrap and the SQLite catalog
//! - **config_tests**: Configuration defaults and validation
//! - **error_tests**: HTTP error mapping
//! - **health_api_tests**: Ops endpoints
//!
//! Individual modules can be run with e.g. `cargo test sync_tests`.

pub mod support;

pub mod compress_tests;
pub mod db_tests;

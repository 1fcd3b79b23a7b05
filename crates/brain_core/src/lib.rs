//! Core record store for Brain notes.
//!
//! Notes ("cells") are appended to a single log file and addressed by their
//! `"<offset>:<length>"` byte range. A SQLite FTS5 index maps query text back
//! to those identifiers.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod search;
pub mod service;
pub mod storage;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::cell::Cell;
pub use model::cell_id::{CellId, CellIdError};
pub use search::coordinator::{IndexCoordinator, IndexError, IndexResult, MAX_QUERY_RESULTS};
pub use search::engine::{SearchEngine, SearchError, SearchMode, SearchResult};
pub use search::fts::FtsSearchEngine;
pub use service::cell_store::{CellStore, ReconcileReport, StoreError, StoreResult};
pub use storage::{AppendLog, CodecError};

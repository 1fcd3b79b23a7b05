//! SQLite database backing the full-text index.
//!
//! Opening a connection applies every pending schema migration; errors are
//! reported as [`SearchError`](crate::search::engine::SearchError).

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

//! Full-text search over cells.
//!
//! # Responsibility
//! - Define the search-engine contract and its SQLite FTS5 implementation.
//! - Coordinate index/remove/query calls on behalf of the cell store.

pub mod coordinator;
pub mod engine;
pub mod fts;

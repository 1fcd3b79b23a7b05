//! Cell domain model.
//!
//! # Responsibility
//! - Define the in-memory shape of one stored note.
//!
//! # Invariants
//! - `offset` is assigned once at write time and never changes.
//! - `timestamp` is whole seconds since the Unix epoch (UTC).

use crate::model::cell_id::CellId;
use serde::{Deserialize, Serialize};

/// A single note persisted in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Byte position of the first record byte within the log.
    pub offset: u64,
    /// Creation time, seconds since epoch (UTC).
    pub timestamp: i64,
    /// Note text. May contain newlines.
    pub data: String,
}

impl Cell {
    pub fn new(offset: u64, timestamp: i64, data: impl Into<String>) -> Self {
        Self {
            offset,
            timestamp,
            data: data.into(),
        }
    }

    /// Identifier for this cell given its serialized record length.
    pub fn id_with_length(&self, length: u64) -> CellId {
        CellId::new(self.offset, length)
    }
}

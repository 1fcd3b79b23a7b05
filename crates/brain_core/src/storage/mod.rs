//! Durable cell storage: the append-only log and its record codec.
//!
//! # Responsibility
//! - Own the single log file that is the source of truth for note content.
//! - Frame cells into self-delimiting records.
//!
//! # Invariants
//! - Bytes are only ever appended; nothing is truncated or rewritten in place.
//! - Consecutive records are packed with no gaps.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod append_log;
pub mod codec;

pub use append_log::{AppendLog, LogScan};
pub use codec::{decode_cell, encode_cell, identifier_of, CodecError};

/// Failure while walking the log record by record.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Codec(CodecError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CodecError> for StorageError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

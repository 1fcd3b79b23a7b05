//! Positional cell identifier.
//!
//! # Responsibility
//! - Encode a `(offset, length)` byte range as the canonical `"<offset>:<length>"` token.
//! - Parse tokens back into the exact range they were derived from.
//!
//! # Invariants
//! - Both fields are base-10, unpadded.
//! - Parsing never checks bounds against the log; that is deferred to the read.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of one cell: byte offset and serialized byte length within the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub offset: u64,
    pub length: u64,
}

/// Malformed identifier token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellIdError {
    /// Token does not split into exactly two `:`-separated segments.
    InvalidShape(String),
    /// A segment is not a base-10 unsigned integer.
    InvalidNumber {
        token: String,
        field: &'static str,
        source: ParseIntError,
    },
}

impl Display for CellIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidShape(token) => {
                write!(f, "invalid cell identifier `{token}`: expected `<offset>:<length>`")
            }
            Self::InvalidNumber {
                token,
                field,
                source,
            } => write!(f, "invalid cell identifier `{token}`: bad {field}: {source}"),
        }
    }
}

impl Error for CellIdError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidShape(_) => None,
            Self::InvalidNumber { source, .. } => Some(source),
        }
    }
}

impl CellId {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Parses a `"<offset>:<length>"` token.
    pub fn parse(token: &str) -> Result<Self, CellIdError> {
        let segments = token.split(':').collect::<Vec<_>>();
        let [offset, length] = segments.as_slice() else {
            return Err(CellIdError::InvalidShape(token.to_string()));
        };

        Ok(Self {
            offset: parse_field(token, "offset", offset)?,
            length: parse_field(token, "length", length)?,
        })
    }

    /// Byte position one past the end of the named record.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.offset, self.length)
    }
}

impl FromStr for CellId {
    type Err = CellIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_field(token: &str, field: &'static str, raw: &str) -> Result<u64, CellIdError> {
    raw.parse::<u64>()
        .map_err(|source| CellIdError::InvalidNumber {
            token: token.to_string(),
            field,
            source,
        })
}

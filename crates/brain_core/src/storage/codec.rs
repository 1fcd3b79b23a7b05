//! Cell record codec.
//!
//! # Responsibility
//! - Serialize a cell's timestamp and text into one log record.
//! - Parse record bytes back into timestamp and text.
//!
//! # Invariants
//! - Record layout is `<timestamp> <data_len>\n<data>`, both header fields base-10.
//! - Records are self-delimiting: the header alone determines the record length.
//! - No fixed-width field; any `i64` timestamp round-trips.

use crate::model::cell_id::CellId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::string::FromUtf8Error;

/// Upper bound on header bytes: sign + 19 digits, space, 20 digits, newline.
pub const MAX_HEADER_LEN: usize = 42;

const HEADER_TERMINATOR: u8 = b'\n';

/// Record-level decode failure.
#[derive(Debug)]
pub enum CodecError {
    /// No header terminator within the first [`MAX_HEADER_LEN`] bytes.
    MissingHeader { available: usize },
    /// Header is not `<timestamp> <data_len>`.
    InvalidHeader(String),
    /// Declared payload length disagrees with the bytes present.
    LengthMismatch { declared: u64, actual: u64 },
    InvalidUtf8(FromUtf8Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader { available } => {
                write!(f, "cell record header not found in {available} bytes")
            }
            Self::InvalidHeader(header) => write!(f, "invalid cell record header `{header}`"),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "cell record declares {declared} data bytes but {actual} are present"
            ),
            Self::InvalidUtf8(err) => write!(f, "cell data is not valid UTF-8: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

/// Parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub timestamp: i64,
    /// Bytes occupied by the header, terminator included.
    pub header_len: u64,
    pub data_len: u64,
}

impl RecordHeader {
    /// Total serialized length of the record this header starts.
    ///
    /// `None` when the declared data length overflows the offset space.
    pub fn record_len(&self) -> Option<u64> {
        self.header_len.checked_add(self.data_len)
    }
}

/// Serializes a cell record.
pub fn encode_cell(timestamp: i64, data: &[u8]) -> Vec<u8> {
    let header = format!("{timestamp} {}\n", data.len());
    let mut bytes = Vec::with_capacity(header.len() + data.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(data);
    bytes
}

/// Parses a full record into `(timestamp, data)`.
pub fn decode_cell(bytes: &[u8]) -> Result<(i64, String), CodecError> {
    let header = decode_header(bytes)?;
    let payload = &bytes[header.header_len as usize..];
    if payload.len() as u64 != header.data_len {
        return Err(CodecError::LengthMismatch {
            declared: header.data_len,
            actual: payload.len() as u64,
        });
    }

    let data = String::from_utf8(payload.to_vec()).map_err(CodecError::InvalidUtf8)?;
    Ok((header.timestamp, data))
}

/// Parses the header at the start of `bytes`; trailing bytes are ignored.
pub fn decode_header(bytes: &[u8]) -> Result<RecordHeader, CodecError> {
    let window = &bytes[..bytes.len().min(MAX_HEADER_LEN)];
    let Some(end) = window.iter().position(|byte| *byte == HEADER_TERMINATOR) else {
        return Err(CodecError::MissingHeader {
            available: bytes.len(),
        });
    };

    let raw = String::from_utf8_lossy(&window[..end]);
    let invalid = || CodecError::InvalidHeader(raw.to_string());
    let (timestamp, data_len) = raw.split_once(' ').ok_or_else(invalid)?;
    let timestamp = timestamp.parse::<i64>().map_err(|_| invalid())?;
    let data_len = data_len.parse::<u64>().map_err(|_| invalid())?;

    Ok(RecordHeader {
        timestamp,
        header_len: end as u64 + 1,
        data_len,
    })
}

/// Identifier naming `encoded` when stored at `offset`.
pub fn identifier_of(offset: u64, encoded: &[u8]) -> CellId {
    CellId::new(offset, encoded.len() as u64)
}

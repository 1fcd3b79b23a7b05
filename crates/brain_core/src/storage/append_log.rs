//! Append-only log file.
//!
//! # Responsibility
//! - Append record bytes at the current end of a single file.
//! - Serve exact `(offset, length)` reads.
//! - Walk records sequentially for maintenance passes.
//!
//! # Invariants
//! - `size()` is read from the file system on every call, so it reflects
//!   whatever a failed append left behind.
//! - Reads past the current end fail before touching the file.

use super::codec::{decode_header, CodecError, MAX_HEADER_LEN};
use super::StorageError;
use crate::model::cell_id::CellId;
use log::{debug, error, info};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Single growable file holding every cell record.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: File,
    sync_writes: bool,
}

impl AppendLog {
    /// Opens the log at `path`, creating it and its parent directory on first use.
    ///
    /// When `sync_writes` is set, every append is followed by `sync_data`.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) => {
                error!(
                    "event=log_open module=storage status=error path={} error={}",
                    path.display(),
                    err
                );
                return Err(err);
            }
        };

        let log = Self {
            path,
            file,
            sync_writes,
        };
        info!(
            "event=log_open module=storage status=ok path={} size={}",
            log.path.display(),
            log.size()?
        );
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length in bytes; the offset the next append will land at.
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Writes `bytes` at the end of the log and returns the new size.
    ///
    /// A failed append may have written a prefix of `bytes`; callers must
    /// re-read `size()` rather than reuse an earlier offset.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<u64> {
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }

        let size = self.size()?;
        debug!(
            "event=log_append module=storage status=ok bytes={} size={}",
            bytes.len(),
            size
        );
        Ok(size)
    }

    /// Returns exactly `length` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let size = self.size()?;
        let in_range = offset
            .checked_add(length)
            .is_some_and(|end| end <= size);
        if !in_range {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range {offset}+{length} is past the end of the log ({size} bytes)"),
            ));
        }

        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Walks every record from offset 0 up to the size observed now.
    pub fn scan(&self) -> io::Result<LogScan<'_>> {
        Ok(LogScan {
            log: self,
            offset: 0,
            end: self.size()?,
            done: false,
        })
    }
}

/// Sequential record iterator returned by [`AppendLog::scan`].
///
/// Yields `(id, record bytes)`. Stops after the first error.
pub struct LogScan<'log> {
    log: &'log AppendLog,
    offset: u64,
    end: u64,
    done: bool,
}

impl LogScan<'_> {
    fn read_next(&mut self) -> Result<(CellId, Vec<u8>), StorageError> {
        let remaining = self.end - self.offset;
        let window = self
            .log
            .read_at(self.offset, remaining.min(MAX_HEADER_LEN as u64))?;
        let header = decode_header(&window)?;

        let record_len = match header.record_len() {
            Some(len) if len <= remaining => len,
            _ => {
                return Err(CodecError::LengthMismatch {
                    declared: header.data_len,
                    actual: remaining - header.header_len,
                }
                .into());
            }
        };

        let id = CellId::new(self.offset, record_len);
        let record = self.log.read_at(id.offset, id.length)?;
        self.offset = id.end();
        Ok((id, record))
    }
}

impl Iterator for LogScan<'_> {
    type Item = Result<(CellId, Vec<u8>), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.end {
            return None;
        }

        let item = self.read_next();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::AppendLog;
    use crate::storage::codec::{encode_cell, CodecError};
    use crate::storage::StorageError;
    use std::io::{ErrorKind, Write};

    fn open_temp_log() -> (tempfile::TempDir, AppendLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::open(dir.path().join("nested").join(".data"), false).unwrap();
        (dir, log)
    }

    #[test]
    fn open_creates_empty_log() {
        let (_dir, log) = open_temp_log();
        assert!(log.path().exists());
        assert_eq!(log.size().unwrap(), 0);
    }

    #[test]
    fn append_advances_size_and_returns_it() {
        let (_dir, mut log) = open_temp_log();
        assert_eq!(log.append(b"hello").unwrap(), 5);
        assert_eq!(log.append(b" world").unwrap(), 11);
        assert_eq!(log.size().unwrap(), 11);
    }

    #[test]
    fn read_at_returns_exact_range() {
        let (_dir, mut log) = open_temp_log();
        log.append(b"abcdefgh").unwrap();
        assert_eq!(log.read_at(2, 3).unwrap(), b"cde");
        assert_eq!(log.read_at(8, 0).unwrap(), b"");
    }

    #[test]
    fn read_past_end_fails() {
        let (_dir, mut log) = open_temp_log();
        log.append(b"abc").unwrap();

        let err = log.read_at(1, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        let err = log.read_at(u64::MAX, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reads_after_interleaved_appends_still_hit_the_right_bytes() {
        let (_dir, mut log) = open_temp_log();
        log.append(b"first").unwrap();
        assert_eq!(log.read_at(0, 5).unwrap(), b"first");
        log.append(b"second").unwrap();
        assert_eq!(log.read_at(5, 6).unwrap(), b"second");
        assert_eq!(log.size().unwrap(), 11);
    }

    #[test]
    fn reopen_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".data");
        {
            let mut log = AppendLog::open(&path, true).unwrap();
            log.append(b"persisted").unwrap();
        }

        let mut log = AppendLog::open(&path, true).unwrap();
        assert_eq!(log.size().unwrap(), 9);
        log.append(b"!").unwrap();
        assert_eq!(log.read_at(0, 10).unwrap(), b"persisted!");
    }

    #[test]
    fn scan_walks_packed_records() {
        let (_dir, mut log) = open_temp_log();
        let first = encode_cell(1, b"alpha");
        let second = encode_cell(2, b"beta\nwith newline");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let records = log
            .scan()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0.to_string(), format!("0:{}", first.len()));
        assert_eq!(records[0].1, first);
        assert_eq!(records[1].0.offset, first.len() as u64);
        assert_eq!(records[1].1, second);
    }

    #[test]
    fn scan_stops_at_truncated_tail() {
        let (_dir, mut log) = open_temp_log();
        log.append(&encode_cell(1, b"complete")).unwrap();
        let partial = encode_cell(2, b"cut short");
        log.append(&partial[..partial.len() - 3]).unwrap();

        let mut scan = log.scan().unwrap();
        assert!(scan.next().unwrap().is_ok());
        assert!(matches!(scan.next(), Some(Err(StorageError::Codec(_)))));
        assert!(scan.next().is_none());
    }

    #[test]
    fn scan_rejects_header_declaring_an_overflowing_length() {
        let (_dir, mut log) = open_temp_log();
        log.append(&encode_cell(1, b"ok")).unwrap();
        log.append(b"1 18446744073709551615\nxx").unwrap();

        let mut scan = log.scan().unwrap();
        assert!(scan.next().unwrap().is_ok());
        assert!(matches!(
            scan.next(),
            Some(Err(StorageError::Codec(CodecError::LengthMismatch {
                declared: u64::MAX,
                actual: 2
            })))
        ));
        assert!(scan.next().is_none());
    }

    #[test]
    fn size_reflects_bytes_written_outside_append() {
        let (_dir, log) = open_temp_log();
        let mut raw = std::fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap();
        raw.write_all(b"xyz").unwrap();
        assert_eq!(log.size().unwrap(), 3);
    }
}

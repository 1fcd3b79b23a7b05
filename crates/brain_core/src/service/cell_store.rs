//! Cell store facade.
//!
//! # Responsibility
//! - Compose the log, the record codec and the index coordinator into
//!   write/read/list/delete use cases.
//! - Own the log and index handles for the lifetime of the store.
//! - Re-index cells the index is missing.
//!
//! # Invariants
//! - A cell's offset is the log size observed right before its append.
//! - The log is the source of truth; an index failure after a successful
//!   append does not fail the write.
//! - Delete only touches the index; log bytes are never reclaimed.

use crate::config::{ConfigError, StoreConfig};
use crate::model::cell::Cell;
use crate::model::cell_id::{CellId, CellIdError};
use crate::search::coordinator::{IndexCoordinator, IndexError};
use crate::search::engine::{SearchEngine, SearchError, SearchMode};
use crate::search::fts::FtsSearchEngine;
use crate::storage::{decode_cell, encode_cell, identifier_of, AppendLog, CodecError, StorageError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Log file name inside the store root.
pub const DATA_FILE_NAME: &str = ".data";
/// Index database file name inside the store root.
pub const INDEX_FILE_NAME: &str = ".index.sqlite3";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Malformed identifier token.
    Format(CellIdError),
    /// Record bytes do not decode into a cell.
    Codec(CodecError),
    /// Log open/read/write failure, including out-of-range reads.
    Io(std::io::Error),
    Index(IndexError),
    /// The index database could not be opened.
    IndexOpen(SearchError),
    Config(ConfigError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "cell log I/O failed: {err}"),
            Self::Index(err) => write!(f, "{err}"),
            Self::IndexOpen(err) => write!(f, "failed to open search index: {err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Format(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Index(err) => Some(err),
            Self::IndexOpen(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<CellIdError> for StoreError {
    fn from(value: CellIdError) -> Self {
        Self::Format(value)
    }
}

impl From<CodecError> for StoreError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<IndexError> for StoreError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Io(err) => Self::Io(err),
            StorageError::Codec(err) => Self::Codec(err),
        }
    }
}

/// Outcome of [`CellStore::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records found in the log.
    pub scanned: usize,
    /// Records that were neither indexed nor deleted, now indexed.
    pub reindexed: usize,
}

/// Append-only note store with a full-text index.
pub struct CellStore<E: SearchEngine = FtsSearchEngine> {
    root: PathBuf,
    log: AppendLog,
    index: IndexCoordinator<E>,
}

impl CellStore<FtsSearchEngine> {
    /// Opens the store rooted at `root` with default settings.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_at(root.as_ref(), &StoreConfig::default())
    }

    /// Opens the store at the root resolved from `config`.
    pub fn open_with_config(config: &StoreConfig) -> StoreResult<Self> {
        let root = config.store_root(None)?;
        Self::open_at(&root, config)
    }

    fn open_at(root: &Path, config: &StoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;
        let engine =
            FtsSearchEngine::open(root.join(INDEX_FILE_NAME)).map_err(StoreError::IndexOpen)?;
        Self::with_engine(root, engine, config.sync_writes)
    }
}

impl<E: SearchEngine> CellStore<E> {
    /// Opens the log under `root` and pairs it with an existing engine.
    pub fn with_engine(root: impl AsRef<Path>, engine: E, sync_writes: bool) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let log = AppendLog::open(root.join(DATA_FILE_NAME), sync_writes)?;
        info!(
            "event=store_open module=store status=ok root={}",
            root.display()
        );
        Ok(Self {
            root,
            log,
            index: IndexCoordinator::new(engine),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log(&self) -> &AppendLog {
        &self.log
    }

    pub fn index(&self) -> &IndexCoordinator<E> {
        &self.index
    }

    /// Stores `text` as a new cell stamped with the current time.
    ///
    /// Returns `None` without touching the log or the index when `text` is empty.
    pub fn write(&mut self, text: &str) -> StoreResult<Option<CellId>> {
        self.write_at(text, now_epoch_secs())
    }

    /// Stores `text` as a new cell with an explicit creation time.
    pub fn write_at(&mut self, text: &str, timestamp: i64) -> StoreResult<Option<CellId>> {
        if text.is_empty() {
            return Ok(None);
        }

        let started_at = Instant::now();
        let offset = self.log.size()?;
        let record = encode_cell(timestamp, text.as_bytes());
        let id = identifier_of(offset, &record);

        if let Err(err) = self.log.append(&record) {
            error!(
                "event=cell_write module=store status=error offset={} error={}",
                offset, err
            );
            return Err(err.into());
        }

        if let Err(err) = self.index.index(&id, text) {
            warn!(
                "event=cell_write module=store status=unindexed cell_id={} error={}",
                id, err
            );
        }

        info!(
            "event=cell_write module=store status=ok cell_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(Some(id))
    }

    /// Resolves an identifier token into its cell.
    pub fn read(&self, id: &str) -> StoreResult<Cell> {
        self.read_id(CellId::parse(id)?)
    }

    pub fn read_id(&self, id: CellId) -> StoreResult<Cell> {
        let record = self.log.read_at(id.offset, id.length)?;
        let (timestamp, data) = decode_cell(&record)?;
        Ok(Cell::new(id.offset, timestamp, data))
    }

    /// Runs `query` against the index and resolves every hit, in rank order.
    ///
    /// Fails as a whole if any hit cannot be read.
    pub fn list(&self, query: &str, mode: SearchMode) -> StoreResult<Vec<Cell>> {
        let ids = self.index.query(query, mode)?;
        ids.iter().map(|id| self.read(id)).collect()
    }

    /// Removes `id` from the index. Its bytes stay in the log and `read` keeps working.
    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.index.remove(id)?;
        info!("event=cell_delete module=store status=ok cell_id={}", id);
        Ok(())
    }

    /// Scans the log and indexes every cell that is neither indexed nor deleted.
    ///
    /// Stops at the first unreadable record.
    pub fn reconcile(&mut self) -> StoreResult<ReconcileReport> {
        let started_at = Instant::now();
        let mut report = ReconcileReport::default();

        for entry in self.log.scan()? {
            let (id, record) = entry?;
            report.scanned += 1;
            if !self.index.is_missing(&id)? {
                continue;
            }

            let (_, data) = decode_cell(&record)?;
            self.index.index(&id, &data)?;
            report.reindexed += 1;
        }

        info!(
            "event=store_reconcile module=store status=ok scanned={} reindexed={} duration_ms={}",
            report.scanned,
            report.reindexed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Releases the log and index handles.
    pub fn close(self) {
        info!(
            "event=store_close module=store status=ok root={}",
            self.root.display()
        );
    }
}

fn now_epoch_secs() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    }
}

//! Index coordinator between the cell store and the search engine.
//!
//! # Responsibility
//! - Forward index/remove calls keyed by cell identifier.
//! - Run capped, relevance-ordered queries.
//!
//! # Invariants
//! - Nothing is retried here; every engine failure surfaces as [`IndexError`].
//! - Query results never exceed [`MAX_QUERY_RESULTS`].

use super::engine::{SearchEngine, SearchError, SearchMode};
use crate::model::cell_id::CellId;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Hard cap on identifiers returned by one query.
pub const MAX_QUERY_RESULTS: u32 = 100;

pub type IndexResult<T> = Result<T, IndexError>;

/// Search-engine call failure, tagged with the operation that failed.
#[derive(Debug)]
pub enum IndexError {
    Index { id: String, source: SearchError },
    Remove { id: String, source: SearchError },
    Query { mode: SearchMode, source: SearchError },
    Lookup { id: String, source: SearchError },
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index { id, source } => write!(f, "failed to index cell {id}: {source}"),
            Self::Remove { id, source } => write!(f, "failed to unindex cell {id}: {source}"),
            Self::Query { mode, source } => {
                write!(f, "{} query failed: {source}", mode.as_str())
            }
            Self::Lookup { id, source } => {
                write!(f, "failed to look up index state of cell {id}: {source}")
            }
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index { source, .. }
            | Self::Remove { source, .. }
            | Self::Query { source, .. }
            | Self::Lookup { source, .. } => Some(source),
        }
    }
}

/// Thin adapter owning the search engine handle.
pub struct IndexCoordinator<E: SearchEngine> {
    engine: E,
}

impl<E: SearchEngine> IndexCoordinator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Submits `text` for indexing under `id`.
    pub fn index(&mut self, id: &CellId, text: &str) -> IndexResult<()> {
        let id = id.to_string();
        let started_at = Instant::now();
        match self.engine.index(&id, text) {
            Ok(()) => {
                debug!(
                    "event=cell_index module=index status=ok cell_id={} duration_ms={}",
                    id,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    "event=cell_index module=index status=error cell_id={} error={}",
                    id, source
                );
                Err(IndexError::Index { id, source })
            }
        }
    }

    /// Removes `id` from the index. The token is passed through unparsed.
    pub fn remove(&mut self, id: &str) -> IndexResult<()> {
        self.engine.delete(id).map_err(|source| {
            warn!(
                "event=cell_unindex module=index status=error cell_id={} error={}",
                id, source
            );
            IndexError::Remove {
                id: id.to_string(),
                source,
            }
        })?;
        debug!("event=cell_unindex module=index status=ok cell_id={}", id);
        Ok(())
    }

    /// Returns matching identifier tokens, best match first.
    ///
    /// Zero matches is an empty list, not an error.
    pub fn query(&self, text: &str, mode: SearchMode) -> IndexResult<Vec<String>> {
        let started_at = Instant::now();
        let mut ids = self
            .engine
            .query(text, mode, MAX_QUERY_RESULTS)
            .map_err(|source| {
                warn!(
                    "event=cell_query module=index status=error mode={} error={}",
                    mode.as_str(),
                    source
                );
                IndexError::Query { mode, source }
            })?;
        ids.truncate(MAX_QUERY_RESULTS as usize);

        debug!(
            "event=cell_query module=index status=ok mode={} hits={} duration_ms={}",
            mode.as_str(),
            ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ids)
    }

    /// Whether `id` needs indexing: not indexed and not explicitly removed.
    pub fn is_missing(&self, id: &CellId) -> IndexResult<bool> {
        let id = id.to_string();
        let lookup = |source| IndexError::Lookup {
            id: id.clone(),
            source,
        };
        if self.engine.contains(&id).map_err(lookup)? {
            return Ok(false);
        }
        Ok(!self.engine.is_removed(&id).map_err(lookup)?)
    }
}

//! Search-engine collaborator contract.
//!
//! # Responsibility
//! - Define the index/query/delete surface the store consumes.
//! - Enumerate query matching modes.
//!
//! # Invariants
//! - Documents are keyed by the cell identifier token.
//! - `query` results are relevance-ordered, best first.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SearchResult<T> = Result<T, SearchError>;

/// Collaborator-level failure.
#[derive(Debug)]
pub enum SearchError {
    /// Query text could not be turned into a valid engine expression.
    InvalidQuery { query: String, message: String },
    /// The on-disk index was written by a newer schema than this build knows.
    UnsupportedSchemaVersion { found: u32, latest_supported: u32 },
    Sqlite(rusqlite::Error),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::UnsupportedSchemaVersion {
                found,
                latest_supported,
            } => write!(
                f,
                "index schema version {found} is newer than supported {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Matching strategy requested from the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Every word (run of letters or digits) must occur.
    #[default]
    Keyword,
    /// Terms must occur adjacent and in order.
    Phrase,
    /// Each term matches indexed terms within one edit.
    Fuzzy,
    /// `*` matches any run of characters, `?` exactly one.
    Wildcard,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Phrase => "phrase",
            Self::Fuzzy => "fuzzy",
            Self::Wildcard => "wildcard",
        }
    }
}

/// Full-text engine consumed by the index coordinator.
pub trait SearchEngine {
    /// Indexes `text` under `id`, replacing any previous document for `id`.
    fn index(&mut self, id: &str, text: &str) -> SearchResult<()>;
    /// Returns up to `limit` matching ids, best match first.
    fn query(&self, text: &str, mode: SearchMode, limit: u32) -> SearchResult<Vec<String>>;
    /// Drops the document for `id` and remembers the removal.
    fn delete(&mut self, id: &str) -> SearchResult<()>;
    /// Whether a document is currently indexed under `id`.
    fn contains(&self, id: &str) -> SearchResult<bool>;
    /// Whether `id` was removed and not indexed again since.
    fn is_removed(&self, id: &str) -> SearchResult<bool>;
}

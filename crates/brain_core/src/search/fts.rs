//! SQLite FTS5 search engine.
//!
//! # Responsibility
//! - Index cell text under its identifier token.
//! - Translate query text and [`SearchMode`] into FTS5 match expressions.
//! - Track removed identifiers for reconciliation.
//!
//! # Invariants
//! - At most one document per identifier; re-indexing replaces it.
//! - Result ordering is deterministic by `bm25` rank, then insertion order.
//! - Fuzzy and wildcard terms are expanded against the indexed vocabulary,
//!   never passed to FTS5 as raw syntax.

use super::engine::{SearchEngine, SearchError, SearchMode, SearchResult};
use crate::db::{open_db, open_db_in_memory};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

static TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid term regex"));
static PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}*?]+").expect("valid wildcard pattern regex"));

const FUZZY_MAX_EDITS: usize = 1;
const MAX_TERM_EXPANSIONS: usize = 64;

/// Search engine persisted in a SQLite database with an FTS5 table.
pub struct FtsSearchEngine {
    conn: Connection,
}

impl FtsSearchEngine {
    /// Opens or creates the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> SearchResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a non-persistent index.
    pub fn open_in_memory() -> SearchResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    fn match_expression(&self, text: &str, mode: SearchMode) -> SearchResult<Option<String>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let expression = match mode {
            SearchMode::Keyword => TERM_RE
                .find_iter(text)
                .map(|term| quote_term(term.as_str()))
                .collect::<Vec<_>>()
                .join(" AND "),
            SearchMode::Phrase => quote_term(&text.split_whitespace().collect::<Vec<_>>().join(" ")),
            SearchMode::Fuzzy => {
                let lowered = text.to_lowercase();
                let mut groups = Vec::new();
                for term in TERM_RE.find_iter(&lowered) {
                    let expansions = self.expand_fuzzy(term.as_str())?;
                    if expansions.is_empty() {
                        return Ok(None);
                    }
                    groups.push(any_of(&expansions));
                }
                groups.join(" AND ")
            }
            SearchMode::Wildcard => {
                let lowered = text.to_lowercase();
                let mut groups = Vec::new();
                for pattern in PATTERN_RE.find_iter(&lowered) {
                    let pattern = pattern.as_str();
                    let expansions = if pattern.contains(['*', '?']) {
                        self.expand_glob(pattern)?
                    } else {
                        vec![pattern.to_string()]
                    };
                    if expansions.is_empty() {
                        return Ok(None);
                    }
                    groups.push(any_of(&expansions));
                }
                groups.join(" AND ")
            }
        };

        if expression.is_empty() {
            return Ok(None);
        }
        Ok(Some(expression))
    }

    fn expand_fuzzy(&self, term: &str) -> SearchResult<Vec<String>> {
        let len = term.chars().count();
        let mut stmt = self.conn.prepare(
            "SELECT term FROM cells_vocab
             WHERE length(term) BETWEEN ?1 AND ?2
             ORDER BY doc DESC, term ASC;",
        )?;
        let candidates = stmt
            .query_map(
                params![
                    len.saturating_sub(FUZZY_MAX_EDITS) as i64,
                    (len + FUZZY_MAX_EDITS) as i64
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(candidates
            .into_iter()
            .filter(|candidate| edit_distance(term, candidate) <= FUZZY_MAX_EDITS)
            .take(MAX_TERM_EXPANSIONS)
            .collect())
    }

    fn expand_glob(&self, pattern: &str) -> SearchResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT term FROM cells_vocab
             WHERE term GLOB ?1
             ORDER BY doc DESC, term ASC
             LIMIT ?2;",
        )?;
        let terms = stmt
            .query_map(params![pattern, MAX_TERM_EXPANSIONS as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }
}

impl SearchEngine for FtsSearchEngine {
    fn index(&mut self, id: &str, text: &str) -> SearchResult<()> {
        let tx = self.conn.transaction()?;
        remove_document(&tx, id)?;
        tx.execute("INSERT INTO indexed_cells (cell_id) VALUES (?1);", [id])?;
        let doc_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO cells_fts (rowid, body) VALUES (?1, ?2);",
            params![doc_id, text],
        )?;
        tx.execute("DELETE FROM removed_cells WHERE cell_id = ?1;", [id])?;
        tx.commit()?;
        Ok(())
    }

    fn query(&self, text: &str, mode: SearchMode, limit: u32) -> SearchResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(match_expr) = self.match_expression(text, mode)? else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(
            "SELECT indexed_cells.cell_id
             FROM cells_fts
             JOIN indexed_cells ON indexed_cells.doc_id = cells_fts.rowid
             WHERE cells_fts MATCH ?1
             ORDER BY bm25(cells_fts), indexed_cells.doc_id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt
            .query(params![match_expr, i64::from(limit)])
            .map_err(|err| map_query_error(err, &match_expr))?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| map_query_error(err, &match_expr))?
        {
            ids.push(row.get::<_, String>(0)?);
        }
        Ok(ids)
    }

    fn delete(&mut self, id: &str) -> SearchResult<()> {
        let tx = self.conn.transaction()?;
        remove_document(&tx, id)?;
        tx.execute(
            "INSERT OR IGNORE INTO removed_cells (cell_id) VALUES (?1);",
            [id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn contains(&self, id: &str) -> SearchResult<bool> {
        Ok(document_id(&self.conn, id)?.is_some())
    }

    fn is_removed(&self, id: &str) -> SearchResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM removed_cells WHERE cell_id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn document_id(conn: &Connection, id: &str) -> SearchResult<Option<i64>> {
    let doc_id = conn
        .query_row(
            "SELECT doc_id FROM indexed_cells WHERE cell_id = ?1;",
            [id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(doc_id)
}

fn remove_document(conn: &Connection, id: &str) -> SearchResult<()> {
    if let Some(doc_id) = document_id(conn, id)? {
        conn.execute("DELETE FROM cells_fts WHERE rowid = ?1;", [doc_id])?;
        conn.execute("DELETE FROM indexed_cells WHERE doc_id = ?1;", [doc_id])?;
    }
    Ok(())
}

fn quote_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn any_of(terms: &[String]) -> String {
    let quoted = terms
        .iter()
        .map(|term| quote_term(term))
        .collect::<Vec<_>>();
    format!("({})", quoted.join(" OR "))
}

/// Levenshtein distance over Unicode scalar values.
fn edit_distance(left: &str, right: &str) -> usize {
    let right = right.chars().collect::<Vec<_>>();
    let mut previous = (0..=right.len()).collect::<Vec<_>>();
    let mut current = vec![0; right.len() + 1];

    for (i, left_char) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != *right_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Sqlite(err)
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

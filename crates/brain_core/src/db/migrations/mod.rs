//! Index schema migrations.
//!
//! # Invariants
//! - Versions are strictly increasing and mirrored to `PRAGMA user_version`.
//! - Each migration commits together with its version bump, so an interrupted
//!   upgrade resumes from the last completed step.

use crate::search::engine::{SearchError, SearchResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_cells_fts.sql"),
}];

/// Returns the latest schema version known by this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the index schema up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> SearchResult<()> {
    let found = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    for migration in pending_migrations(found)? {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        info!(
            "event=index_migrate module=db status=ok from={} to={}",
            found, migration.version
        );
    }
    Ok(())
}

fn pending_migrations(found: u32) -> SearchResult<&'static [Migration]> {
    let latest_supported = latest_version();
    if found > latest_supported {
        return Err(SearchError::UnsupportedSchemaVersion {
            found,
            latest_supported,
        });
    }

    let applied = MIGRATIONS.partition_point(|migration| migration.version <= found);
    Ok(&MIGRATIONS[applied..])
}

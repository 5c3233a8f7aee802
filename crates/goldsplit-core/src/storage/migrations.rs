//! Database schema migrations for goldsplit.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use tracing::warn;

/// Apply all pending migrations to bring the database to the current
/// schema version.
///
/// # Errors
/// Returns an error if a migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    match conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()
    {
        Ok(Some(version)) => version,
        Ok(None) => 0,
        Err(err) => {
            warn!("failed to read schema_version: {err}");
            0
        }
    }
}

fn set_schema_version(tx: &rusqlite::Transaction<'_>, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: initial schema.
///
/// Four tables: the singleton `config` row, the ordered `split_names`
/// list, the `runs` history, and the per-run `splits`. Durations are
/// stored as integer nanoseconds; timestamps as RFC 3339 text.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS config (
            id        INTEGER PRIMARY KEY CHECK (id = 1),
            title     TEXT NOT NULL,
            category  TEXT NOT NULL,
            attempts  INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS split_names (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            name     TEXT NOT NULL,
            position INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            category    TEXT NOT NULL,
            started_at  TEXT NOT NULL,
            ended_at    TEXT NOT NULL,
            completed   INTEGER NOT NULL DEFAULT 0,
            is_pb       INTEGER NOT NULL DEFAULT 0,
            attempt_num INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS splits (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id      INTEGER NOT NULL REFERENCES runs (id),
            split_index INTEGER NOT NULL,
            split_name  TEXT NOT NULL,
            duration_ns INTEGER NOT NULL,
            UNIQUE (run_id, split_index)
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: indexes.
///
/// The partial unique index backs the "at most one is_pb row" invariant
/// at the schema level; the save protocol still clears-then-sets inside
/// its transaction.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_runs_single_pb
            ON runs (is_pb) WHERE is_pb = 1;
         CREATE INDEX IF NOT EXISTS idx_runs_completed ON runs (completed);
         CREATE INDEX IF NOT EXISTS idx_splits_run_id ON splits (run_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

//! SQLite-backed run storage.
//!
//! Owns durability for the singleton configuration row, the ordered
//! split-name list, and the full history of runs and their per-split
//! durations. Every multi-statement write runs in one transaction; a
//! failed statement rolls the whole operation back, so no partial run
//! is ever visible.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{data_dir, migrations, Config};
use crate::error::PersistenceError;
use crate::import::ImportPlan;

/// The singleton configuration row.
#[derive(Debug, Clone)]
pub struct ConfigRow {
    pub title: String,
    pub category: String,
    /// Total attempts ever started.
    pub attempts: u32,
    /// Total attempts that reached the final split.
    pub completed: u32,
}

/// A finished or abandoned attempt, ready to be saved.
#[derive(Debug)]
pub struct NewRun<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub completed: bool,
    /// New value of the attempts counter; also the run's attempt number.
    pub attempts: u32,
    /// New value of the completed counter.
    pub completed_runs: u32,
    /// Recorded durations, index-aligned to `split_names`.
    pub durations: &'a [Duration],
    /// Split names at save time.
    pub split_names: &'a [String],
}

/// Result of saving a run.
#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    pub run_id: i64,
    /// Whether the run was promoted to personal best.
    pub promoted: bool,
}

/// SQLite database holding the run history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/goldsplit/goldsplit.db`.
    ///
    /// Creates the file and migrates the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, PersistenceError> {
        Self::open_at(data_dir()?.join("goldsplit.db"))
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| PersistenceError::Open {
            path: PathBuf::from(path),
            source,
        })?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests and ephemeral use).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(PersistenceError::Sqlite)?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Load the configuration row, inserting one from the seed if the
    /// database is fresh.
    pub fn load_or_seed_config(&self, seed: &Config) -> Result<ConfigRow, PersistenceError> {
        let row = self
            .conn
            .query_row(
                "SELECT title, category, attempts, completed FROM config WHERE id = 1",
                [],
                |row| {
                    Ok(ConfigRow {
                        title: row.get(0)?,
                        category: row.get(1)?,
                        attempts: row.get(2)?,
                        completed: row.get(3)?,
                    })
                },
            )
            .optional()?;

        match row {
            Some(row) => Ok(row),
            None => {
                self.conn.execute(
                    "INSERT INTO config (id, title, category, attempts, completed)
                     VALUES (1, ?1, ?2, 0, 0)",
                    params![seed.title, seed.category],
                )?;
                Ok(ConfigRow {
                    title: seed.title.clone(),
                    category: seed.category.clone(),
                    attempts: 0,
                    completed: 0,
                })
            }
        }
    }

    /// Update the title and category in place. Counters are untouched.
    pub fn update_meta(&self, title: &str, category: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "UPDATE config SET title = ?1, category = ?2 WHERE id = 1",
            params![title, category],
        )?;
        Ok(())
    }

    /// Load the split names in display order.
    pub fn split_names(&self) -> Result<Vec<String>, PersistenceError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM split_names ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    /// Replace the split-name list wholesale (no partial edits).
    pub fn replace_split_names(&mut self, names: &[String]) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM split_names", [])?;
        for (position, name) in names.iter().enumerate() {
            tx.execute(
                "INSERT INTO split_names (name, position) VALUES (?1, ?2)",
                params![name, position],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── Save protocol ────────────────────────────────────────────────

    /// Save a finished or abandoned attempt in one transaction: bump the
    /// config counters, insert the run row, evaluate PB promotion for
    /// completed runs, insert the split rows.
    ///
    /// Promotion compares against the stored PB total inside the same
    /// transaction: no PB promotes unconditionally, otherwise only a
    /// strictly smaller total promotes (ties never do).
    pub fn save_run(&mut self, run: &NewRun<'_>) -> Result<SaveOutcome, PersistenceError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "UPDATE config SET attempts = ?1, completed = ?2 WHERE id = 1",
            params![run.attempts, run.completed_runs],
        )?;

        tx.execute(
            "INSERT INTO runs (title, category, started_at, ended_at, completed, is_pb, attempt_num)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                run.title,
                run.category,
                run.started_at.to_rfc3339(),
                run.ended_at.to_rfc3339(),
                run.completed,
                run.attempts,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        let mut promoted = false;
        if run.completed {
            let total = total_ns(run.durations);
            let pb_total: Option<i64> = tx.query_row(
                "SELECT SUM(s.duration_ns)
                 FROM splits s JOIN runs r ON s.run_id = r.id
                 WHERE r.is_pb = 1 AND r.completed = 1",
                [],
                |row| row.get(0),
            )?;

            promoted = match pb_total {
                None => true,
                Some(pb_total) => total < pb_total,
            };
            if promoted {
                tx.execute("UPDATE runs SET is_pb = 0 WHERE is_pb = 1", [])?;
                tx.execute("UPDATE runs SET is_pb = 1 WHERE id = ?1", params![run_id])?;
            }
        }

        for (index, duration) in run.durations.iter().enumerate() {
            tx.execute(
                "INSERT INTO splits (run_id, split_index, split_name, duration_ns)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run_id, index, run.split_names[index], duration_to_ns(*duration)],
            )?;
        }

        tx.commit()?;
        Ok(SaveOutcome { run_id, promoted })
    }

    /// Force-promote the most recently inserted completed run to PB,
    /// regardless of its total. Returns the promoted run's id, or `None`
    /// (with nothing changed) if no completed run exists.
    pub fn promote_latest_completed(&mut self) -> Result<Option<i64>, PersistenceError> {
        let tx = self.conn.transaction()?;

        tx.execute("UPDATE runs SET is_pb = 0 WHERE is_pb = 1", [])?;
        let latest: Option<i64> = tx
            .query_row(
                "SELECT id FROM runs WHERE completed = 1 ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match latest {
            Some(id) => {
                tx.execute("UPDATE runs SET is_pb = 1 WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(Some(id))
            }
            // Dropping the transaction rolls back the flag clear.
            None => Ok(None),
        }
    }

    // ── Import ───────────────────────────────────────────────────────

    /// Apply an import plan in one transaction: replace the config row
    /// and the split names, demote any existing PB, and insert the
    /// imported PB run and its splits if the plan carries one.
    pub fn apply_import(&mut self, plan: &ImportPlan) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO config (id, title, category, attempts, completed)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![plan.title, plan.category, plan.attempts, plan.completed],
        )?;

        tx.execute("DELETE FROM split_names", [])?;
        for (position, name) in plan.split_names.iter().enumerate() {
            tx.execute(
                "INSERT INTO split_names (name, position) VALUES (?1, ?2)",
                params![name, position],
            )?;
        }

        tx.execute("UPDATE runs SET is_pb = 0 WHERE is_pb = 1", [])?;

        if let Some(pb) = &plan.personal_best {
            tx.execute(
                "INSERT INTO runs (title, category, started_at, ended_at, completed, is_pb, attempt_num)
                 VALUES (?1, ?2, ?3, ?4, 1, 1, ?5)",
                params![
                    plan.title,
                    plan.category,
                    pb.started_at.to_rfc3339(),
                    pb.ended_at.to_rfc3339(),
                    pb.attempt,
                ],
            )?;
            let run_id = tx.last_insert_rowid();
            for (index, segment) in pb.segments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO splits (run_id, split_index, split_name, duration_ns)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        run_id,
                        index,
                        plan.split_names[index],
                        duration_to_ns(*segment)
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn duration_to_ns(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

pub(crate) fn duration_from_ns(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}

fn total_ns(durations: &[Duration]) -> i64 {
    durations
        .iter()
        .fold(0i64, |acc, d| acc.saturating_add(duration_to_ns(*d)))
}

//! Run manager: the attempt lifecycle plus its persistence side effects.
//!
//! The manager owns the database, the cached configuration, the cached
//! personal best (annotated with best segments) and the in-progress
//! attempt. All mutating operations are expected to be invoked
//! sequentially from one control path; queries are cheap and never
//! mutate, so a presentation loop can poll them every frame.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ImportError, InvalidStateError, Result};
use crate::history;
use crate::import::SplitsDocument;
use crate::run::Run;
use crate::storage::{Config, Database, NewRun};
use crate::timer::attempt::{Attempt, AttemptMode};

pub struct RunManager {
    db: Database,
    title: String,
    category: String,
    attempts: u32,
    completed_runs: u32,
    split_names: Vec<String>,
    pb: Option<Run>,
    attempt: Attempt,
}

impl RunManager {
    /// Open the default database, seeding a fresh one from the on-disk
    /// seed configuration.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or read.
    pub fn open() -> Result<Self> {
        let seed = Config::load_or_default();
        Self::with_database(Database::open()?, &seed)
    }

    /// Open a database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or read.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let seed = Config::load_or_default();
        Self::with_database(Database::open_at(path)?, &seed)
    }

    /// Build a manager over an already-open database, seeding the config
    /// row and split names from `seed` when the database is fresh, and
    /// loading the personal best and its best segments when one exists.
    ///
    /// # Errors
    /// Returns an error if the configuration or history cannot be read.
    pub fn with_database(mut db: Database, seed: &Config) -> Result<Self> {
        let config = db.load_or_seed_config(seed)?;
        let mut split_names = db.split_names()?;
        if split_names.is_empty() {
            db.replace_split_names(&seed.split_names)?;
            split_names = seed.split_names.clone();
        }

        let mut manager = Self {
            db,
            title: config.title,
            category: config.category,
            attempts: config.attempts,
            completed_runs: config.completed,
            split_names,
            pb: None,
            attempt: Attempt::Idle,
        };
        manager.reload_personal_best()?;
        Ok(manager)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Total attempts ever started.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total attempts that reached the final split.
    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    pub fn split_names(&self) -> &[String] {
        &self.split_names
    }

    pub fn mode(&self) -> AttemptMode {
        self.attempt.mode()
    }

    /// 0-based index of the split currently being timed.
    pub fn current_split(&self) -> usize {
        self.attempt.current_split()
    }

    /// Durations recorded for the current attempt, in split order.
    pub fn recorded_splits(&self) -> &[Duration] {
        self.attempt.recorded()
    }

    /// Elapsed time of the current attempt: zero when idle, live while
    /// running, frozen at the final total when completed.
    pub fn elapsed(&self) -> Duration {
        self.attempt.elapsed(Utc::now())
    }

    /// Elapsed time of the split currently being timed; zero unless
    /// running.
    pub fn current_split_elapsed(&self) -> Duration {
        self.attempt
            .current_split_elapsed(Utc::now(), self.split_names.len())
    }

    /// The personal best, with best-segment annotations, if one exists.
    pub fn personal_best(&self) -> Option<&Run> {
        self.pb.as_ref()
    }

    /// Whether the completed current attempt beats the loaded personal
    /// best (strictly). A completed attempt with no PB loaded counts as
    /// better; an attempt that is not completed never does.
    pub fn is_better_than_pb(&self) -> bool {
        if self.attempt.mode() != AttemptMode::Completed {
            return false;
        }
        let total: Duration = self.attempt.recorded().iter().sum();
        match &self.pb {
            Some(pb) => total < pb.total(),
            None => true,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Begin a new attempt. Always permitted; a finished attempt that was
    /// never reset is simply discarded from memory (it was persisted when
    /// it finished).
    pub fn start(&mut self) {
        self.start_at(Utc::now());
    }

    /// Record the current split. On the final split the attempt is
    /// persisted as completed and evaluated for PB promotion. Returns
    /// whether this was the final split.
    ///
    /// # Errors
    /// `InvalidState` if no attempt is running; `Persistence` if the
    /// final save fails, in which case the attempt rewinds to before the
    /// split so the operation can be retried whole.
    pub fn split(&mut self) -> Result<bool> {
        self.split_at(Utc::now())
    }

    /// Drop the last recorded split and rewind to it.
    ///
    /// # Errors
    /// `InvalidState` if no attempt is running or nothing was recorded.
    pub fn undo_split(&mut self) -> Result<()> {
        self.undo_split_at(Utc::now())
    }

    /// Abandon or acknowledge the current attempt. A running attempt is
    /// persisted as unfinished first -- it consumes an attempt number and
    /// is never eligible for PB. In-progress state is then cleared.
    ///
    /// # Errors
    /// `Persistence` if saving the unfinished attempt fails; the attempt
    /// is left running so the reset can be retried.
    pub fn reset(&mut self) -> Result<()> {
        self.reset_at(Utc::now())
    }

    pub(crate) fn start_at(&mut self, now: DateTime<Utc>) {
        self.attempt.start(now);
    }

    pub(crate) fn split_at(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let checkpoint = self.attempt.clone();
        let was_final = self.attempt.record_split(now, self.split_names.len())?;
        if was_final {
            if let Err(err) = self.persist_attempt(true, now) {
                self.attempt = checkpoint;
                return Err(err);
            }
        }
        Ok(was_final)
    }

    pub(crate) fn undo_split_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.attempt.undo(now)?;
        Ok(())
    }

    pub(crate) fn reset_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.attempt.mode() == AttemptMode::Running {
            self.persist_attempt(false, now)?;
        }
        self.attempt.clear();
        Ok(())
    }

    /// Force-promote the most recently saved completed run to PB,
    /// regardless of whether it was faster.
    ///
    /// The run is selected by insertion order at override time; if
    /// another completed run were saved between the caller's decision and
    /// this call, that one would be promoted instead. This recency
    /// ambiguity is inherited behavior -- a safer interface would take
    /// the id of the run to promote.
    ///
    /// # Errors
    /// `InvalidState` if the current attempt is not completed or no
    /// completed run exists; `Persistence` on transaction failure.
    pub fn save_as_pb(&mut self) -> Result<()> {
        if self.attempt.mode() != AttemptMode::Completed {
            return Err(InvalidStateError::OverrideNotCompleted.into());
        }
        match self.db.promote_latest_completed()? {
            Some(run_id) => {
                debug!(run_id, "personal best overridden");
                self.reload_personal_best()?;
                Ok(())
            }
            None => Err(InvalidStateError::NoCompletedRun.into()),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Update the title and category. Runs snapshot these at save time,
    /// so history keeps the names it was attempted under.
    pub fn update_meta(&mut self, title: &str, category: &str) -> Result<()> {
        self.db.update_meta(title, category)?;
        self.title = title.to_string();
        self.category = category.to_string();
        Ok(())
    }

    /// Replace the split-name list wholesale.
    ///
    /// # Errors
    /// `InvalidState` while an attempt is running (recorded durations are
    /// index-aligned to the list); `Import` if the list is empty.
    pub fn replace_split_names(&mut self, names: Vec<String>) -> Result<()> {
        if names.is_empty() {
            return Err(ImportError::EmptySplitNames.into());
        }
        if self.attempt.mode() == AttemptMode::Running {
            return Err(InvalidStateError::AttemptInProgress {
                operation: "replace split names",
            }
            .into());
        }
        self.db.replace_split_names(&names)?;
        self.split_names = names;
        // The split count may have changed; re-align the PB annotations.
        self.reload_personal_best()?;
        Ok(())
    }

    /// Replace the configuration and personal best from an import
    /// document, atomically. In-memory state is only updated after the
    /// transaction commits.
    ///
    /// # Errors
    /// `InvalidState` while an attempt is running; `Import` on any parse
    /// or conversion failure (nothing is mutated); `Persistence` on
    /// transaction failure.
    pub fn import(&mut self, document: &SplitsDocument) -> Result<()> {
        if self.attempt.mode() == AttemptMode::Running {
            return Err(InvalidStateError::AttemptInProgress {
                operation: "import",
            }
            .into());
        }
        let plan = document.to_plan(Utc::now())?;
        self.db.apply_import(&plan)?;

        self.title = plan.title;
        self.category = plan.category;
        self.attempts = plan.attempts;
        self.completed_runs = plan.completed;
        self.split_names = plan.split_names;
        debug!(title = %self.title, splits = self.split_names.len(), "import applied");
        self.reload_personal_best()?;
        Ok(())
    }

    /// Read and apply a JSON import document from disk.
    ///
    /// # Errors
    /// As [`RunManager::import`], plus `Import` if the file cannot be
    /// read or parsed.
    pub fn import_from_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = SplitsDocument::from_path(path)?;
        self.import(&document)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Save the current attempt inside one transaction, then update the
    /// in-memory counters. The counters are computed as locals and only
    /// assigned after commit, so a rollback cannot desync memory from
    /// the store.
    fn persist_attempt(&mut self, completed: bool, ended_at: DateTime<Utc>) -> Result<()> {
        let durations = self.attempt.recorded().to_vec();
        let started_at = self.attempt.started_at().unwrap_or(ended_at);
        let attempts = self.attempts + 1;
        let completed_runs = if completed {
            self.completed_runs + 1
        } else {
            self.completed_runs
        };

        let outcome = self.db.save_run(&NewRun {
            title: &self.title,
            category: &self.category,
            started_at,
            ended_at,
            completed,
            attempts,
            completed_runs,
            durations: &durations,
            split_names: &self.split_names,
        })?;

        self.attempts = attempts;
        self.completed_runs = completed_runs;
        debug!(
            run_id = outcome.run_id,
            completed,
            promoted = outcome.promoted,
            "attempt saved"
        );

        // Any completed save can introduce a new gold segment even when
        // it does not promote, so the PB cache is refreshed either way.
        // The run row is committed at this point; a failed reload only
        // leaves the cache stale, so warn instead of failing the
        // already-durable save.
        if completed {
            if let Err(err) = self.reload_personal_best() {
                warn!("failed to reload personal best after save: {err}");
            }
        }
        Ok(())
    }

    /// Reload the PB from the store and recompute its best-segment
    /// annotations against all completed runs.
    fn reload_personal_best(&mut self) -> Result<()> {
        let mut pb = history::load_personal_best(self.db.conn())?;
        if let Some(run) = pb.as_mut() {
            let best = history::best_segments(self.db.conn(), self.split_names.len())?;
            history::annotate_best_segments(run, &best);
        }
        self.pb = pb;
        Ok(())
    }
}

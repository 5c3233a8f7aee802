//! Recorded runs and their splits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single timed segment of a recorded run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSplit {
    /// Split name as snapshotted at save time.
    pub name: String,
    /// Time spent on this checkpoint (not cumulative).
    pub duration: Duration,
    /// Best duration ever recorded at this split's index across all
    /// completed runs ("gold split"). Computed in memory by the history
    /// scan, never persisted. `None` means no data, not zero.
    #[serde(default)]
    pub best_segment: Option<Duration>,
}

/// A finished or abandoned attempt as stored in the database.
///
/// Immutable after insert except for the `is_pb` flag, which the save
/// protocol and the manual override move between runs transactionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    /// Title snapshot copied from the configuration at save time.
    pub title: String,
    /// Category snapshot copied from the configuration at save time.
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Whether the attempt reached the final split.
    pub completed: bool,
    /// At most one run carries this flag at any time.
    pub is_pb: bool,
    /// Value of the attempts counter when this run was saved.
    pub attempt: u32,
    /// Ordered by split index.
    pub splits: Vec<RunSplit>,
}

impl Run {
    /// Total duration: the sum of all split durations.
    pub fn total(&self) -> Duration {
        self.splits.iter().map(|s| s.duration).sum()
    }
}

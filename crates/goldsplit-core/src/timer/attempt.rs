//! In-progress attempt state.
//!
//! The attempt is a wall-clock state machine with three modes:
//!
//! ```text
//! Idle -> Running -> Completed -> Idle
//! ```
//!
//! It owns no threads and reads no clock itself; every transition takes
//! `now` from the caller. The state is transient -- it has no identity in
//! the store until the run manager saves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::InvalidStateError;

/// Lifecycle mode of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptMode {
    Idle,
    Running,
    Completed,
}

/// State of the attempt currently being timed.
///
/// Exactly one variant is inhabited at a time; "completed while running"
/// is unrepresentable.
#[derive(Debug, Clone)]
pub enum Attempt {
    Idle,
    Running {
        /// When the attempt started.
        started_at: DateTime<Utc>,
        /// When the current split started.
        split_started_at: DateTime<Utc>,
        /// 0-based index of the split being timed.
        current_split: usize,
        /// Durations recorded so far, one per finished split.
        recorded: Vec<Duration>,
    },
    Completed {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        recorded: Vec<Duration>,
    },
}

impl Attempt {
    pub fn mode(&self) -> AttemptMode {
        match self {
            Attempt::Idle => AttemptMode::Idle,
            Attempt::Running { .. } => AttemptMode::Running,
            Attempt::Completed { .. } => AttemptMode::Completed,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Begin counting fresh. Any previous in-memory state is discarded;
    /// nothing already persisted is touched.
    pub fn start(&mut self, now: DateTime<Utc>) {
        *self = Attempt::Running {
            started_at: now,
            split_started_at: now,
            current_split: 0,
            recorded: Vec::new(),
        };
    }

    /// Record the current split. Returns whether this was the final split,
    /// in which case the attempt transitions to `Completed`.
    pub fn record_split(
        &mut self,
        now: DateTime<Utc>,
        split_count: usize,
    ) -> Result<bool, InvalidStateError> {
        match self {
            Attempt::Running {
                started_at,
                split_started_at,
                current_split,
                recorded,
            } => {
                if *current_split >= split_count {
                    return Err(InvalidStateError::AllSplitsRecorded);
                }
                recorded.push(delta(*split_started_at, now));
                if *current_split + 1 == split_count {
                    *self = Attempt::Completed {
                        started_at: *started_at,
                        ended_at: now,
                        recorded: std::mem::take(recorded),
                    };
                    Ok(true)
                } else {
                    *current_split += 1;
                    *split_started_at = now;
                    Ok(false)
                }
            }
            _ => Err(InvalidStateError::SplitNotRunning),
        }
    }

    /// Drop the last recorded split and rewind to it. The rewound split's
    /// clock restarts at `now`.
    pub fn undo(&mut self, now: DateTime<Utc>) -> Result<(), InvalidStateError> {
        match self {
            Attempt::Running {
                split_started_at,
                current_split,
                recorded,
                ..
            } => {
                if recorded.pop().is_none() {
                    return Err(InvalidStateError::UndoNothingRecorded);
                }
                *current_split -= 1;
                *split_started_at = now;
                Ok(())
            }
            _ => Err(InvalidStateError::UndoNotRunning),
        }
    }

    /// Clear all in-progress state back to `Idle`.
    pub fn clear(&mut self) {
        *self = Attempt::Idle;
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Elapsed time of the attempt. Zero when idle, frozen at the final
    /// total when completed, live while running.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Attempt::Idle => Duration::ZERO,
            Attempt::Running { started_at, .. } => delta(*started_at, now),
            Attempt::Completed { recorded, .. } => recorded.iter().sum(),
        }
    }

    /// Elapsed time of the split being timed. Only meaningful while
    /// running with a split left to record; zero otherwise.
    pub fn current_split_elapsed(&self, now: DateTime<Utc>, split_count: usize) -> Duration {
        match self {
            Attempt::Running {
                split_started_at,
                current_split,
                ..
            } if *current_split < split_count => delta(*split_started_at, now),
            _ => Duration::ZERO,
        }
    }

    /// 0-based index of the split being timed. While completed this is
    /// the final index; while idle it is zero.
    pub fn current_split(&self) -> usize {
        match self {
            Attempt::Idle => 0,
            Attempt::Running { current_split, .. } => *current_split,
            Attempt::Completed { recorded, .. } => recorded.len().saturating_sub(1),
        }
    }

    /// Durations recorded for this attempt so far, in split order.
    pub fn recorded(&self) -> &[Duration] {
        match self {
            Attempt::Idle => &[],
            Attempt::Running { recorded, .. } | Attempt::Completed { recorded, .. } => recorded,
        }
    }

    /// When the attempt started, if one has been started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Attempt::Idle => None,
            Attempt::Running { started_at, .. } | Attempt::Completed { started_at, .. } => {
                Some(*started_at)
            }
        }
    }
}

impl Default for Attempt {
    fn default() -> Self {
        Attempt::Idle
    }
}

/// Wall-clock delta, clamped to zero if the clock went backwards.
fn delta(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).to_std().unwrap_or(Duration::ZERO)
}

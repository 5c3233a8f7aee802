//! Import of declarative split configurations.
//!
//! An import document replaces the configuration, the split names, and
//! optionally the personal best wholesale. The PB block gives each
//! checkpoint as a cumulative clock time ("m:ss.fff" or "ss.fff");
//! differencing consecutive values yields the per-segment durations.
//! Parsing is pure; the transactional replacement lives in
//! [`Database::apply_import`](crate::storage::database::Database::apply_import).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ImportError;

/// Declarative description of a split configuration.
///
/// The core does not care how the document was sourced; `from_path` is a
/// convenience for the common JSON-file case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitsDocument {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub completed: u32,
    pub split_names: Vec<String>,
    #[serde(default)]
    pub personal_best: Option<PersonalBestBlock>,
}

/// Personal best carried by an import document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalBestBlock {
    /// Attempt number the PB was achieved on.
    pub attempt: u32,
    /// Cumulative clock times, one per checkpoint, in split order.
    pub splits: Vec<ClockEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockEntry {
    pub time: String,
}

impl SplitsDocument {
    /// Read and parse a JSON document from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Validate the document and convert it into an executable plan.
    ///
    /// The synthetic start time is `now` minus 24 hours -- the import has
    /// no real historical timestamp, only durations.
    pub(crate) fn to_plan(&self, now: DateTime<Utc>) -> Result<ImportPlan, ImportError> {
        if self.split_names.is_empty() {
            return Err(ImportError::EmptySplitNames);
        }

        let personal_best = match &self.personal_best {
            Some(block) if !block.splits.is_empty() => {
                if block.splits.len() != self.split_names.len() {
                    return Err(ImportError::SplitCountMismatch {
                        splits: block.splits.len(),
                        names: self.split_names.len(),
                    });
                }
                let cumulative = block
                    .splits
                    .iter()
                    .map(|entry| parse_clock_time(&entry.time))
                    .collect::<Result<Vec<_>, _>>()?;
                let segments = segments_from_cumulative(&cumulative)?;
                let total: Duration = segments.iter().sum();

                let started_at = now - chrono::Duration::hours(24);
                let ended_at = started_at
                    + chrono::Duration::from_std(total).map_err(|_| ImportError::InvalidTime {
                        value: format!("{}s total", total.as_secs()),
                    })?;
                Some(PersonalBestPlan {
                    attempt: block.attempt,
                    started_at,
                    ended_at,
                    segments,
                })
            }
            _ => None,
        };

        Ok(ImportPlan {
            title: self.title.clone(),
            category: self.category.clone(),
            attempts: self.attempts,
            completed: self.completed,
            split_names: self.split_names.clone(),
            personal_best,
        })
    }
}

/// A validated import, ready to be applied in one transaction.
#[derive(Debug, Clone)]
pub(crate) struct ImportPlan {
    pub title: String,
    pub category: String,
    pub attempts: u32,
    pub completed: u32,
    pub split_names: Vec<String>,
    pub personal_best: Option<PersonalBestPlan>,
}

#[derive(Debug, Clone)]
pub(crate) struct PersonalBestPlan {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Per-segment durations, index-aligned to the split names.
    pub segments: Vec<Duration>,
}

/// Parse a clock time in "minutes:seconds.fraction" or "seconds.fraction"
/// form into a duration.
pub fn parse_clock_time(value: &str) -> Result<Duration, ImportError> {
    let invalid = || ImportError::InvalidTime {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (minutes, seconds) = match trimmed.split_once(':') {
        Some((minutes, seconds)) => (
            minutes.parse::<f64>().map_err(|_| invalid())?,
            seconds.parse::<f64>().map_err(|_| invalid())?,
        ),
        None => (0.0, trimmed.parse::<f64>().map_err(|_| invalid())?),
    };
    if minutes < 0.0 || seconds < 0.0 {
        return Err(invalid());
    }

    Duration::try_from_secs_f64(minutes * 60.0 + seconds).map_err(|_| invalid())
}

/// Difference consecutive cumulative times into per-segment durations:
/// the first segment is its own cumulative value, each later segment is
/// its cumulative value minus the previous one.
fn segments_from_cumulative(cumulative: &[Duration]) -> Result<Vec<Duration>, ImportError> {
    let mut segments = Vec::with_capacity(cumulative.len());
    let mut previous = Duration::ZERO;
    for (index, &value) in cumulative.iter().enumerate() {
        let segment = value
            .checked_sub(previous)
            .ok_or(ImportError::NonMonotonicTime { index })?;
        segments.push(segment);
        previous = value;
    }
    Ok(segments)
}

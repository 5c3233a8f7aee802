//! Core error types for goldsplit-core.
//!
//! Three failure classes cover everything the library can report:
//! lifecycle violations ([`InvalidStateError`]), storage failures
//! ([`PersistenceError`]) and import failures ([`ImportError`]), plus
//! a small class for the TOML seed configuration. None of these mutate
//! state when returned; a failed operation leaves memory and store as
//! they were.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for goldsplit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An operation was attempted in a lifecycle state that forbids it.
    #[error("invalid state: {0}")]
    InvalidState(#[from] InvalidStateError),

    /// A transaction or statement against the store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// An import document could not be parsed or converted.
    #[error("import error: {0}")]
    Import(#[from] ImportError),

    /// The seed configuration could not be read or written.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle violations. Always reported, never silently ignored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStateError {
    #[error("cannot split: no attempt is running")]
    SplitNotRunning,

    #[error("cannot split: all splits already recorded")]
    AllSplitsRecorded,

    #[error("cannot undo: no attempt is running")]
    UndoNotRunning,

    #[error("cannot undo: no splits recorded yet")]
    UndoNothingRecorded,

    #[error("cannot override personal best: attempt not completed")]
    OverrideNotCompleted,

    #[error("cannot override personal best: no completed run exists")]
    NoCompletedRun,

    #[error("cannot {operation} while an attempt is running")]
    AttemptInProgress { operation: &'static str },
}

/// Storage failures. The triggering operation is rolled back whole;
/// no partial run is ever visible.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to open database at {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Import failures. The entire import is aborted with no partial effect.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read import document: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse import document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot parse split time {value:?}")]
    InvalidTime { value: String },

    #[error("cumulative split times decrease at index {index}")]
    NonMonotonicTime { index: usize },

    #[error("personal best has {splits} splits but {names} split names")]
    SplitCountMismatch { splits: usize, names: usize },

    #[error("split name list cannot be empty")]
    EmptySplitNames,
}

/// Seed configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

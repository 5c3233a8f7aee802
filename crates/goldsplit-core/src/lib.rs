//! # Goldsplit Core Library
//!
//! Core logic for the Goldsplit run timer: a split-timer state machine,
//! SQLite-backed run history, and personal-best tracking.
//!
//! ## Architecture
//!
//! - **Run Manager**: wall-clock lifecycle state machine (start / split /
//!   undo / reset) that persists every finished or abandoned attempt
//! - **Storage**: SQLite run history with versioned migrations, plus a
//!   TOML seed configuration
//! - **History**: read-only aggregation of the personal best and the
//!   best-ever duration per split index ("gold splits")
//! - **Import**: atomic replacement of the configuration and personal
//!   best from a declarative JSON document
//!
//! ## Key Components
//!
//! - [`RunManager`]: attempt lifecycle and PB-promotion orchestration
//! - [`Database`]: transactional run persistence
//! - [`SplitsDocument`]: the import document shape
//!
//! The crate owns no threads, installs no logging subscriber, and reads
//! the wall clock only on demand. Hosts drive every operation and
//! serialize mutating access themselves; queries never mutate and can be
//! polled every rendered frame.

pub mod error;
pub mod history;
pub mod import;
pub mod run;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, ImportError, InvalidStateError, PersistenceError, Result};
pub use import::SplitsDocument;
pub use run::{Run, RunSplit};
pub use storage::{Config, Database};
pub use timer::{Attempt, AttemptMode, RunManager};

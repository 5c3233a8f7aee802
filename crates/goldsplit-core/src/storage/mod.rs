mod config;
pub mod database;
pub mod migrations;

pub use config::Config;
pub use database::{ConfigRow, Database, NewRun, SaveOutcome};

use std::path::PathBuf;

/// Returns `~/.config/goldsplit[-dev]/` based on GOLDSPLIT_ENV.
///
/// Set GOLDSPLIT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GOLDSPLIT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("goldsplit-dev")
    } else {
        base_dir.join("goldsplit")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

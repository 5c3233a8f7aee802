//! TOML-based seed configuration.
//!
//! Holds the values used to initialize a fresh database: the run title,
//! the category, and the ordered split names. Once a database exists its
//! own `config` row is authoritative; this file is only consulted when
//! seeding.
//!
//! Stored at `~/.config/goldsplit/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Seed configuration for a fresh database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Ordered checkpoint names. Order is significant; the list defines
    /// the split count of every run recorded under this configuration.
    #[serde(default = "default_split_names")]
    pub split_names: Vec<String>,
}

fn default_title() -> String {
    "New Speedrun".into()
}

fn default_category() -> String {
    "Any%".into()
}

fn default_split_names() -> Vec<String> {
    ["Level 1", "Level 2", "Level 3", "Final Boss"]
        .map(String::from)
        .to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            category: default_category(),
            split_names: default_split_names(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default file if none exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if
    /// the default cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, returning the default on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.title, "New Speedrun");
        assert_eq!(parsed.category, "Any%");
        assert_eq!(parsed.split_names.len(), 4);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("title = \"Celeste\"").unwrap();
        assert_eq!(parsed.title, "Celeste");
        assert_eq!(parsed.category, "Any%");
        assert_eq!(parsed.split_names, default_split_names());
    }
}

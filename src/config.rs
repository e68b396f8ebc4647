//! User settings for the command-line client.
//!
//! Settings live in an optional JSON file. Missing fields and a missing file
//! fall back to defaults.

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "BANKFLOW_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid date_format in {path}: {format:?}")]
    InvalidDateFormat { path: PathBuf, format: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Shown after every amount
    #[serde(default = "default_currency_label")]
    pub currency_label: String,

    /// strftime format for dates
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// `tracing` filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_database_path() -> String {
    "bankflow.db".to_string()
}

fn default_currency_label() -> String {
    "DH".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            currency_label: default_currency_label(),
            date_format: default_date_format(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // chrono only reports a bad format when the date is rendered
        if !is_valid_date_format(&settings.date_format) {
            return Err(ConfigError::InvalidDateFormat {
                path: path.to_path_buf(),
                format: settings.date_format,
            });
        }
        Ok(settings)
    }

    /// Load from an explicit path if given, then from `BANKFLOW_CONFIG`,
    /// otherwise use defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::load(Path::new(&path)),
                None => Ok(Settings::default()),
            },
        }
    }
}

fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

//! `scormkit.toml` configuration.
//!
//! Every key has a default and a missing file is not an error, so a bare
//! checkout runs with SCORM 1.2 limits and the stock rate limits.

use crate::core::error::ScormError;
use crate::core::schemas::ATTEMPTS_DB_NAME;
use crate::core::validators::CmiLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "scormkit.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScormkitConfig {
    pub runtime: RuntimeConfig,
    pub player: PlayerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum `cmi.suspend_data` length in characters.
    pub suspend_data_max_len: usize,
    /// Writes at or past this objective/interaction index fail with 406.
    pub max_collection_entries: usize,
    /// Strip script markup from SetValue values before validation.
    pub sanitize_values: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let limits = CmiLimits::default();
        Self {
            suspend_data_max_len: limits.suspend_data_max_len,
            max_collection_entries: limits.max_collection_entries,
            sanitize_values: false,
        }
    }
}

impl RuntimeConfig {
    pub fn limits(&self) -> CmiLimits {
        CmiLimits {
            suspend_data_max_len: self.suspend_data_max_len,
            max_collection_entries: self.max_collection_entries,
        }
    }
}

/// Per-session limits, counted over a one-minute window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub api_calls_per_minute: u32,
    pub commits_per_minute: u32,
    pub set_values_per_minute: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            api_calls_per_minute: 100,
            commits_per_minute: 20,
            set_values_per_minute: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(ATTEMPTS_DB_NAME),
        }
    }
}

/// Load config from an explicit file, or from `scormkit.toml` in `dir`.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<ScormkitConfig, ScormError> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ScormError::NotFound(format!(
                    "config file {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => dir.join(CONFIG_FILE_NAME),
    };

    if !config_path.exists() {
        return Ok(ScormkitConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(ScormError::IoError)?;
    parse_config(&content)
        .map_err(|e| ScormError::ConfigError(format!("{}: {}", config_path.display(), e)))
}

pub fn parse_config(content: &str) -> Result<ScormkitConfig, ScormError> {
    toml::from_str(content).map_err(|e| ScormError::ConfigError(e.to_string()))
}

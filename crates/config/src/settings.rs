// Application settings
// Loaded from ~/.config/parcel-ledger/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use parcel_ledger::LedgerConfig;
use tracing::warn;

use crate::error::ConfigError;

const APP_DIR: &str = "parcel-ledger";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Store
    #[serde(rename = "store.path", skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,  // None = data dir default

    // Logging
    #[serde(rename = "log.filter")]
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: None,
            log_filter: "parcel_ledger=info,warn".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default settings");
                Self::default()
            }
        }
    }

    /// Strict load. Lines starting with `//` are treated as comments.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Store file location: the configured path, else the platform data dir.
    pub fn effective_store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("store.json"),
        }
    }

    /// Ledger config from `ledger.toml` beside the settings file.
    pub fn ledger_config(&self) -> Result<LedgerConfig, ConfigError> {
        let dir = Self::config_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ledger_config_in(&dir)
    }
}

/// Read `ledger.toml` from `dir`. A missing file yields the defaults.
pub fn ledger_config_in(dir: &Path) -> Result<LedgerConfig, ConfigError> {
    let path = dir.join("ledger.toml");
    if !path.exists() {
        return Ok(LedgerConfig::default());
    }
    let contents = fs::read_to_string(&path)?;
    Ok(LedgerConfig::from_toml(&contents)?)
}

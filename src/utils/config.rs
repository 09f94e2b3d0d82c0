use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Default timeout for a single backend call (ms)
    pub default_timeout_ms: u64,

    /// Default retry count for failed commands
    pub default_retry_count: u32,

    /// Delay between retries (ms)
    pub retry_delay_ms: u64,

    /// Maximum number of history entries kept
    pub history_limit: usize,

    /// Explicit path to the idb executable
    pub idb_path: Option<PathBuf>,

    /// Where screenshots and recordings go when no path is given
    pub artifacts_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30000,
            default_retry_count: 0,
            retry_delay_ms: 500,
            history_limit: 1000,
            idb_path: None,
            artifacts_dir: PathBuf::from("./output"),
        }
    }
}

impl Config {
    /// Load from an explicit file, else the per-user config file if present,
    /// else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// `<config dir>/sim-pilot/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sim-pilot").join("config.yaml"))
}

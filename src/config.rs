use crate::app::{APP, ORG, QUALIFIER};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_VERSION: u64 = 1;
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub version: u64,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub stop_on_first_error: bool,
    pub show_sub_operation_details: bool,
    pub record_history: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            request_timeout_secs: 30,
            poll_interval_ms: 500,
            stop_on_first_error: false,
            show_sub_operation_details: true,
            record_history: true,
        }
    }
}

impl ConsoleConfig {
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from(QUALIFIER, ORG, APP)
            .map(|directories| directories.config_dir().join(CONFIG_FILE))
    }

    /// Loads the user configuration, falling back to defaults on any error.
    pub fn config() -> ConsoleConfig {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::info!("errors loading config: {e:?}");
                ConsoleConfig::default()
            }),
            _ => ConsoleConfig::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ConsoleConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if config.version > CONFIG_VERSION {
            log::warn!(
                "config version {} is newer than supported version {CONFIG_VERSION}",
                config.version
            );
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or(anyhow!("config path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

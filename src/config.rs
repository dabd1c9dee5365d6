use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::{qlog_debug, Error, Result};

/// Engine tuning knobs, loadable from `~/.quorum/quorum.toml`.
///
/// Every field has a sensible default so a missing config file is not
/// an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of subtasks executing concurrently per task.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_subtasks: usize,
    /// Per-task deadline in seconds. Expiry cancels in-flight subtasks
    /// and fails the task.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Capacity of the scheduler event channel.
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
    /// How many co-assignment pairs system_intelligence() reports.
    #[serde(default = "default_top_n")]
    pub intelligence_top_n: usize,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_deadline_secs() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    100
}

fn default_top_n() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_subtasks: default_max_concurrent(),
            deadline_secs: default_deadline_secs(),
            event_channel_capacity: default_channel_capacity(),
            intelligence_top_n: default_top_n(),
        }
    }
}

impl EngineConfig {
    pub fn quorum_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".quorum"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::quorum_dir()?.join("quorum.toml"))
    }

    /// The per-task deadline as a Duration.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        qlog_debug!("EngineConfig::load path={}", path.display());
        if !path.exists() {
            qlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        qlog_debug!(
            "Config loaded: max_concurrent={}, deadline={}s",
            config.max_concurrent_subtasks,
            config.deadline_secs
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let quorum_dir = Self::quorum_dir()?;
        if !quorum_dir.exists() {
            fs::create_dir_all(&quorum_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        qlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::goals::Goal;
use crate::stats::Period;
use crate::timer::{HealthReading, DEFAULT_GOAL_SECS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Timer target that raises the goal milestone
    pub goal_secs: u64,
    /// How long a milestone stays on screen
    pub milestone_secs: u64,
    pub default_period: Period,
    pub goal: Goal,
    pub mock_temperature: f64,
    pub mock_heart_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            goal_secs: DEFAULT_GOAL_SECS,
            milestone_secs: 3,
            default_period: Period::Week,
            goal: Goal::default(),
            mock_temperature: 41.0,
            mock_heart_rate: 72,
        }
    }
}

impl Config {
    pub fn mock_reading(&self) -> HealthReading {
        HealthReading {
            temperature: self.mock_temperature,
            heart_rate: self.mock_heart_rate,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store at the platform config location
    pub fn new() -> Self {
        Self::with_path(AppDirs::config_path())
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Falls back to defaults when the file is missing or unreadable
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

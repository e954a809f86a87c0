use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Explicit kiosk configuration, replacing ad-hoc globals.
///
/// Durations are stored as whole milliseconds/seconds so the file stays
/// hand-editable on the kiosk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Seconds allowed to enter the full code.
    pub entry_timeout_secs: u64,
    /// Minimum gap between two accepted inputs, in milliseconds.
    pub debounce_ms: u64,
    /// How long success/failure verdicts stay on screen, in milliseconds.
    pub verdict_delay_ms: u64,
    /// Joystick axis magnitude required before a direction registers.
    pub dead_zone: f64,
    /// Liveness probe interval for tracked games, in seconds.
    pub poll_interval_secs: u64,
    /// Grace period between SIGTERM and SIGKILL, in seconds.
    pub grace_period_secs: u64,
    /// Path of the JSON code database.
    pub database: PathBuf,
    /// Directory receiving the kiosk log file.
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let (database, log_dir) = if let Some(pd) = ProjectDirs::from("", "", "coinop") {
            (
                pd.data_local_dir().join("codes.json"),
                pd.data_local_dir().join("logs"),
            )
        } else {
            (PathBuf::from("codes.json"), PathBuf::from("logs"))
        };
        Self {
            entry_timeout_secs: 60,
            debounce_ms: 300,
            verdict_delay_ms: 2000,
            dead_zone: 0.7,
            poll_interval_secs: 10,
            grace_period_secs: 2,
            database,
            log_dir,
        }
    }
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn verdict_delay(&self) -> Duration {
        Duration::from_millis(self.verdict_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
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
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "coinop") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("coinop_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

//! Configuration Management
//!
//! Loads crate configuration from a TOML file. Configuration covers:
//! - Remote backend (endpoint, auth token)
//! - Sync behavior (interval, pull-after-partial-failure)
//! - Expiration alerts (warning offsets, daily reminder time)
//! - Local storage location

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::engine::SyncConfig;
use crate::scheduler::AlertConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LarderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub auth_token: Option<String>,

    /// Current user id from the identity provider. The core only consumes
    /// this value; it never authenticates.
    pub user_id: Option<String>,

    /// Override for the local data directory (default: platform data dir).
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub sync: SyncFileConfig,

    #[serde(default)]
    pub alerts: AlertFileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFileConfig {
    /// Seconds between periodic sync cycles.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Run the pull phase even when some drains failed (the default).
    /// Disabling avoids overwriting a local edit whose push failed, at the
    /// cost of staler reads until the retry succeeds.
    #[serde(default = "default_true")]
    pub pull_after_partial_failure: bool,
}

impl Default for SyncFileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            pull_after_partial_failure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertFileConfig {
    /// Days before expiration to warn, e.g. [1, 3, 7].
    #[serde(default = "default_offsets")]
    pub warning_offsets_days: Vec<i64>,
    /// Clock time (UTC) for future-dated alerts.
    #[serde(default = "default_reminder_time")]
    pub reminder_time: NaiveTime,
}

impl Default for AlertFileConfig {
    fn default() -> Self {
        Self {
            warning_offsets_days: default_offsets(),
            reminder_time: default_reminder_time(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.larder.app".to_string()
}
fn default_sync_interval() -> u64 {
    300
}
fn default_true() -> bool {
    true
}
fn default_offsets() -> Vec<i64> {
    vec![1, 3]
}
fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid constant time")
}

impl Default for LarderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auth_token: None,
            user_id: None,
            data_dir: None,
            sync: SyncFileConfig::default(),
            alerts: AlertFileConfig::default(),
        }
    }
}

impl LarderConfig {
    /// Load configuration from an explicit path, or from the platform config
    /// dir (`~/.config/larder/larder.toml`). A missing file yields defaults;
    /// a malformed file is an error.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            pull_after_partial_failure: self.sync.pull_after_partial_failure,
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            warning_offsets_days: self.alerts.warning_offsets_days.clone(),
            reminder_time: self.alerts.reminder_time,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("larder").join("larder.toml"))
}

//! uptime.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a monitoring-started/stopped notification does besides logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Reload the whole site collection from the authoritative source.
    Resync,
    /// Record the lifecycle phase and leave local state alone.
    LogOnly,
}

/// Lifecycle handling used when none is configured.
pub const DEFAULT_LIFECYCLE_POLICY: LifecyclePolicy = LifecyclePolicy::Resync;

impl Default for LifecyclePolicy {
    fn default() -> Self {
        DEFAULT_LIFECYCLE_POLICY
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UptimeConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    pub snapshot: Option<SnapshotConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub lifecycle_policy: LifecyclePolicy,
    /// Forces development mode on or off. Unset defers to `UPTIME_ENV`.
    pub development: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info,uptime_sync=debug".to_string()
}

impl UptimeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: UptimeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config that resyncs from the given snapshot file.
    pub fn scaffold(snapshot_path: &Path) -> Self {
        UptimeConfig {
            sync: SyncConfig {
                lifecycle_policy: DEFAULT_LIFECYCLE_POLICY,
                development: Some(true),
            },
            snapshot: Some(SnapshotConfig {
                path: snapshot_path.to_path_buf(),
            }),
            logging: LoggingConfig::default(),
        }
    }
}

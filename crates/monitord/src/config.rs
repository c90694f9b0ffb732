//! Daemon configuration

use anyhow::{Context, Result};
use monitor_lib::config::NamespaceSelection;
use monitor_lib::store::DEFAULT_STORE_FILE;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, read from `MONITORD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct MonitordConfig {
    /// Instance name for structured logs (pod name under the downward API)
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between monitoring cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory holding config.json, autoscaling_policy.json, namespaces.json
    #[serde(default = "default_settings_dir")]
    pub settings_dir: PathBuf,

    /// Use the mock source and an in-memory autoscaler backend
    #[serde(default)]
    pub use_mock: bool,

    /// Comma-separated namespaces; overrides namespaces.json
    #[serde(default)]
    pub namespaces: Option<String>,

    /// Report recommendations without writing autoscaler objects
    #[serde(default)]
    pub dry_run: bool,

    /// Opt-in retention in minutes; unset keeps every sample
    #[serde(default)]
    pub retention_minutes: Option<u64>,
}

fn default_instance() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "monitord".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_interval() -> u64 {
    60
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/k8s-monitor").join(DEFAULT_STORE_FILE)
}

fn default_settings_dir() -> PathBuf {
    PathBuf::from("/etc/k8s-monitor")
}

impl MonitordConfig {
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITORD").try_parsing(true))
            .build()
            .context("Failed to read MONITORD_* environment")?;

        config
            .try_deserialize()
            .context("Invalid monitord configuration")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention_minutes.map(|m| Duration::from_secs(m * 60))
    }

    /// Namespace override, if one was configured
    pub fn namespace_override(&self) -> Option<NamespaceSelection> {
        self.namespaces.as_ref().map(|list| {
            NamespaceSelection::new(list.split(',').map(str::to_string).collect())
        })
    }
}

//! Settings and store location for the CLI

use anyhow::{Context, Result};
use monitor_lib::config::{default_settings_dir, Settings};
use monitor_lib::store::{UsageStore, DEFAULT_STORE_FILE};
use std::path::PathBuf;

/// Where the CLI reads settings and keeps its usage log
#[derive(Debug, Clone)]
pub struct Paths {
    pub settings_dir: PathBuf,
    pub store_path: PathBuf,
}

impl Paths {
    /// Flags win, then `~/.config/k8s-monitor`; the store lives in the settings dir by default
    pub fn resolve(settings_dir: Option<PathBuf>, store: Option<PathBuf>) -> Self {
        let settings_dir =
            settings_dir.unwrap_or_else(|| default_settings_dir(dirs_next::home_dir()));
        let store_path = store.unwrap_or_else(|| settings_dir.join(DEFAULT_STORE_FILE));
        Self {
            settings_dir,
            store_path,
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        Settings::load(&self.settings_dir).with_context(|| {
            format!(
                "Failed to load settings from {}",
                self.settings_dir.display()
            )
        })
    }

    pub fn store(&self) -> UsageStore {
        UsageStore::open(&self.store_path)
    }
}

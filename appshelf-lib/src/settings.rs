//! Persistent user settings.
//!
//! The settings file is `~/.config/appshelf/settings.toml` (platform config
//! dir). A missing or unreadable file yields defaults; unknown keys are
//! ignored and absent keys take their default.

use std::path::{Path, PathBuf};

use appshelf_remote::{DEFAULT_ASSET_FILE, DEFAULT_ASSET_HOSTS};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::error::LibError;
use crate::loader::DEFAULT_CATALOG_URL;

pub const DEFAULT_WORKERS: usize = 16;
pub const MAX_WORKERS: usize = 64;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the catalog document is fetched from.
    pub catalog_url: String,
    /// Verification worker count, clamped to `1..=64` when used.
    pub workers: usize,
    pub probe_timeout_ms: u64,
    /// Asset base URLs in preference order.
    pub asset_hosts: Vec<String>,
    pub asset_file: String,
    /// Skip all store API traffic (classification and requirement lookups).
    pub no_network: bool,
    /// Scan the plugin directory whenever an id's status is requested.
    pub auto_patch_scan: bool,
    /// Report ids that need no patching as well.
    pub notify_up_to_date: bool,
    /// Overrides install root discovery.
    pub install_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            workers: DEFAULT_WORKERS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            asset_hosts: DEFAULT_ASSET_HOSTS.iter().map(|h| h.to_string()).collect(),
            asset_file: DEFAULT_ASSET_FILE.to_string(),
            no_network: false,
            auto_patch_scan: true,
            notify_up_to_date: false,
            install_root: None,
        }
    }
}

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("appshelf").join("settings.toml")
}

impl Settings {
    /// Load from the canonical path, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from `path`. `Ok(None)` if the file does not exist.
    pub fn try_load_from(path: &Path) -> Result<Option<Self>, LibError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    pub fn save(&self) -> Result<(), LibError> {
        self.save_to(&settings_path())
    }

    /// Write atomically to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), LibError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, self.to_toml()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, LibError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }
}

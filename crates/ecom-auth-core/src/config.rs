//! Process-wide configuration shared by account handles.
//!
//! Holds the persisted store id and language. A `ConfigStore` is a cheap
//! cloneable handle; every clone sees the same values. Writes are not
//! coordinated between handles, so the last write wins.
//!
//! When opened from a file (by default `~/.config/ecom-auth/config.json`)
//! every write is saved back to disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Application name used for the config directory path
const APP_NAME: &str = "ecom-auth";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Store id used when neither the caller nor the config provides one
pub const DEFAULT_STORE_ID: u32 = 1011;

/// Store ids at or below this are reserved and never persisted
pub const RESERVED_STORE_ID_MAX: u32 = 100;

/// Whether a store id is a real tenant that should be remembered
pub fn is_persistable_store_id(store_id: u32) -> bool {
    store_id > RESERVED_STORE_ID_MAX
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub store_id: Option<u32>,
    pub lang: Option<String>,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<Config>>,
    path: Option<Arc<PathBuf>>,
}

impl ConfigStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path` and persist every later write there
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        debug!(path = %path.display(), ?config, "Config loaded");
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(Arc::new(path)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Config::default_path()?)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Persisted store id, or `DEFAULT_STORE_ID`
    pub fn store_id(&self) -> u32 {
        self.snapshot().store_id.unwrap_or(DEFAULT_STORE_ID)
    }

    pub fn set_store_id(&self, store_id: u32) {
        self.update(|config| config.store_id = Some(store_id));
    }

    pub fn lang(&self) -> Option<String> {
        self.snapshot().lang
    }

    pub fn set_lang(&self, lang: impl Into<String>) {
        let lang = lang.into();
        self.update(|config| config.lang = Some(lang));
    }

    pub fn snapshot(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) {
        let snapshot = {
            let mut config = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut config);
            config.clone()
        };
        debug!(config = ?snapshot, "Config updated");

        if let Some(ref path) = self.path {
            if let Err(e) = snapshot.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }
}

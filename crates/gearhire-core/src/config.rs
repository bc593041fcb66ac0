//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, which secure store backs the session, an optional request
//! timeout, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/gearhire/config.json`. The
//! `GEARHIRE_API_URL` and `GEARHIRE_STORE` environment variables override the
//! file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{EncryptedFileStore, KeyringStore, MemoryStore, SecureStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "gearhire";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Encrypted session file name inside the data directory
const SESSION_STORE_FILE: &str = "session.bin";

/// Used when neither the config file nor the environment names an API
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

const API_URL_ENV: &str = "GEARHIRE_API_URL";
const STORE_ENV: &str = "GEARHIRE_STORE";

/// Where the session shadow copy lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Keyring,
    File,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Ok(StoreBackend::Keyring),
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown store backend '{}' (expected keyring, file, or memory)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub last_email: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            store: StoreBackend::default(),
            request_timeout_secs: None,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(store) = std::env::var(STORE_ENV) {
            self.store = store
                .parse()
                .with_context(|| format!("Invalid {} value", STORE_ENV))?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Build the configured secure store.
    ///
    /// The file backend needs a passphrase; other backends ignore it.
    pub fn open_store(&self, passphrase: Option<&str>) -> Result<Arc<dyn SecureStore>> {
        match self.store {
            StoreBackend::Keyring => Ok(Arc::new(KeyringStore::default())),
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::File => {
                let passphrase = passphrase
                    .ok_or_else(|| anyhow::anyhow!("The file store requires a passphrase"))?;
                let path = self.data_dir()?.join(SESSION_STORE_FILE);
                let store = EncryptedFileStore::open(&path, passphrase)
                    .with_context(|| format!("Failed to open session store {}", path.display()))?;
                Ok(Arc::new(store))
            }
        }
    }
}

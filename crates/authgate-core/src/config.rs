//! Application configuration management.
//!
//! Settings are pass-through: base URL, request timeout, debug logging,
//! which durable store to use, endpoint paths, and retry delays.
//!
//! Configuration is stored at `~/.config/authgate/config.json` and can be
//! overridden per process with `AUTHGATE_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::retry::{DEFAULT_RETRY_CEILING_MS, DEFAULT_RETRY_DELAY_MS};
use crate::api::RetryPolicy;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "authgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8081";

/// HTTP request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Files under the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "keyring" => Ok(StoreKind::Keyring),
            "memory" => Ok(StoreKind::Memory),
            other => Err(anyhow::anyhow!("Unknown store kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub health: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            register: "/register".to_string(),
            health: "/actuator/health".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_ms: u64,
    pub debug: bool,
    pub store: StoreKind,
    pub endpoints: Endpoints,
    pub retry_delay_ms: u64,
    pub retry_ceiling_ms: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            debug: false,
            store: StoreKind::default(),
            endpoints: Endpoints::default(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_ceiling_ms: DEFAULT_RETRY_CEILING_MS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

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

    /// Apply `AUTHGATE_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("AUTHGATE_API_URL") {
            self.api_url = url;
        }
        if let Some(timeout) = lookup("AUTHGATE_API_TIMEOUT") {
            self.timeout_ms = timeout
                .parse()
                .with_context(|| format!("Invalid AUTHGATE_API_TIMEOUT: {}", timeout))?;
        }
        if let Some(debug) = lookup("AUTHGATE_DEBUG") {
            self.debug = debug == "true" || debug == "1";
        }
        if let Some(store) = lookup("AUTHGATE_STORE") {
            self.store = store.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file-backed session store
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn query_retry(&self) -> RetryPolicy {
        RetryPolicy::query(
            Duration::from_millis(self.retry_delay_ms),
            Duration::from_millis(self.retry_ceiling_ms),
        )
    }

    pub fn mutation_retry(&self) -> RetryPolicy {
        RetryPolicy::mutation(Duration::from_millis(self.retry_delay_ms))
    }
}

//! Runtime configuration read from the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nutai_core::{ApiError, FileTokenStore, MemoryTokenStore, NutritionClient, TokenStore};
use thiserror::Error;

pub const API_URL_VAR: &str = "NUTAI_API_URL";
pub const TOKEN_FILE_VAR: &str = "NUTAI_TOKEN_FILE";
pub const TIMEOUT_VAR: &str = "NUTAI_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Session file name inside the per-user config directory.
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    /// Where the bearer token is persisted; memory only when `None`.
    pub token_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_file: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self::default();
        if let Some(url) = get(API_URL_VAR) {
            config.api_url = url;
        }
        config.token_file = get(TOKEN_FILE_VAR).map(PathBuf::from);
        if let Some(raw) = get(TIMEOUT_VAR) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    var: TIMEOUT_VAR,
                    value: raw,
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Persist the token under the user's config directory unless
    /// `NUTAI_TOKEN_FILE` already chose a path. Used by the CLI, where every
    /// invocation is a new process.
    pub fn with_default_token_file(mut self) -> Self {
        if self.token_file.is_none() {
            self.token_file = default_token_file();
        }
        self
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match &self.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        }
    }

    /// Fails with `InvalidUrl` when `api_url` is not an http(s) URL.
    pub fn client(&self) -> Result<NutritionClient, ApiError> {
        NutritionClient::with_token_store(&self.api_url, self.token_store())
    }
}

/// `<config dir>/nutai/session.json`, e.g. `~/.config/nutai/session.json`
/// on Linux. `None` when neither a config nor a home directory is known.
pub fn default_token_file() -> Option<PathBuf> {
    token_file_under(dirs::config_dir().as_deref(), dirs::home_dir().as_deref())
}

fn token_file_under(config_dir: Option<&Path>, home_dir: Option<&Path>) -> Option<PathBuf> {
    let base = match (config_dir, home_dir) {
        (Some(config), _) => config.to_path_buf(),
        (None, Some(home)) => home.join(".config"),
        (None, None) => return None,
    };
    Some(base.join("nutai").join(SESSION_FILE))
}

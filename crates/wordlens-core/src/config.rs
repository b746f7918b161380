//! Client configuration and the on-disk home directory layout.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use toml::{from_str, to_string_pretty};

use crate::types::{DEFAULT_LIMIT, clamp_limit};
use crate::{Error, Result};

/// Env var overriding the home directory.
pub const ENV_HOME: &str = "WORDLENS_HOME";
/// Base URL used when no configuration says otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Name of the client configuration file inside the home directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Name of the key-value settings file inside the home directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Connection settings for the embedding service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the service, e.g. `https://example.org`.
    pub base_url: String,
    /// Request timeout; the HTTP client default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Neighbor count used when a command does not give one.
    pub default_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: None,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Resolve the home directory: `$WORDLENS_HOME`, else `<config dir>/wordlens`.
    ///
    /// # Errors
    /// Returns an error if the platform config directory cannot be determined
    pub fn default_home() -> Result<PathBuf> {
        if let Ok(home) = env::var(ENV_HOME) {
            return Ok(PathBuf::from(home));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_owned()))?;
        Ok(config_dir.join("wordlens"))
    }

    /// Path of the configuration file inside `home`.
    pub fn config_path(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    /// Load config from `home`, creating it with default values if missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create(home: &Path) -> Result<Self> {
        let config_path = Self::config_path(home);

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = from_str(&contents)?;
        tracing::debug!(path = %path.display(), base_url = %config.base_url, "loaded client config");
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = to_string_pretty(self)?;
        let header = "# wordlens client configuration\n\
                      # Created on first run; edit to point at another service\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Parsed base URL.
    ///
    /// # Errors
    /// Returns `Error::Config` if `base_url` is not an absolute http(s) URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|error| Error::Config(format!("Invalid base URL '{}': {error}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL must use http or https: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Configured default limit, clamped into the accepted range.
    pub fn default_limit(&self) -> usize {
        clamp_limit(self.default_limit)
    }
}

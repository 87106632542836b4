// Configuration management module
// Handles loading, saving, and validating configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.listenbrainz.org";

const SUBMIT_PATH: &str = "/1/submit-listens";

/// Upper bound for `retry_interval` and `request_timeout`, one day
const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds to wait before retrying a failed submission
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,

    /// Connect and read timeout in seconds for a single submission
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Text cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// ListenBrainz instance to submit listens to
    pub listenbrainz: ListenBrainzConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Enable text cleanup
    pub enabled: bool,

    /// Regex patterns to remove from track/album/artist names
    /// Applied in order, each pattern is removed from the text
    pub patterns: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec![
                r"\s*\[Explicit\]$".to_string(),
                r"\s*\[Clean\]$".to_string(),
                r"\s*\(Explicit\)$".to_string(),
                r"\s*\(Clean\)$".to_string(),
                r"\s*- Explicit$".to_string(),
                r"\s*- Clean$".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenBrainzConfig {
    /// Name used in log messages
    #[serde(default = "default_name")]
    pub name: String,

    /// User token from https://listenbrainz.org/profile/
    pub token: String,

    /// Base URL of the instance, a bare host gets the https scheme
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_retry_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

fn default_name() -> String {
    "ListenBrainz".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_interval: default_retry_interval(),
            request_timeout: default_request_timeout(),
            cleanup: CleanupConfig::default(),
            listenbrainz: ListenBrainzConfig {
                name: default_name(),
                token: String::new(),
                api_url: default_api_url(),
            },
        }
    }
}

impl ListenBrainzConfig {
    /// Full URL of the submit-listens endpoint
    pub fn submit_url(&self) -> String {
        let base = self.api_url.trim().trim_end_matches('/');
        if base.contains("://") {
            format!("{}{}", base, SUBMIT_PATH)
        } else {
            format!("https://{}{}", base, SUBMIT_PATH)
        }
    }
}

impl Config {
    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("listenbrainz-scrobbler.toml"))
    }

    /// Load configuration from the given file or the default location.
    /// A missing file is created with defaults before validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let config = if config_path.exists() {
            Self::read(&config_path)?
        } else {
            log::info!("Config file not found, creating default at {:?}", config_path);
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            default_config
        };

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", config_path))?;

        Ok(config)
    }

    /// Parse a configuration file without validating it
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", config_path);

        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval == 0 || self.retry_interval > MAX_INTERVAL_SECS {
            anyhow::bail!("retry_interval must be between 1 and {} seconds", MAX_INTERVAL_SECS);
        }

        if self.request_timeout == 0 || self.request_timeout > MAX_INTERVAL_SECS {
            anyhow::bail!("request_timeout must be between 1 and {} seconds", MAX_INTERVAL_SECS);
        }

        let lb = &self.listenbrainz;
        if lb.token.trim().is_empty() {
            anyhow::bail!(
                "ListenBrainz user token is not set ({}). Visit https://listenbrainz.org/profile/ to get a user token.",
                lb.name
            );
        }

        if lb.api_url.trim().is_empty() {
            anyhow::bail!("ListenBrainz api_url is required ({})", lb.name);
        }

        let url = lb.submit_url();
        if !url.starts_with("https://") {
            anyhow::bail!("ListenBrainz api_url must use https ({}): {}", lb.name, lb.api_url);
        }

        attohttpc::RequestBuilder::try_new(attohttpc::Method::POST, &url)
            .with_context(|| format!("Invalid ListenBrainz api_url ({}): {}", lb.name, lb.api_url))?;

        Ok(())
    }
}

//! Configuration management for bonusvarsler.
//!
//! Configuration is read from `~/.config/bonusvarsler/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::DEFAULT_TTL_HOURS;
use crate::fetcher::retry::{DEFAULT_DELAYS_MS, DEFAULT_FALLBACK_ATTEMPTS, DEFAULT_MAX_RETRIES};
use crate::fetcher::{FeedSources, RetryPolicy};

pub const DEFAULT_PRIMARY_URL: &str = "https://feed.bonusvarsler.no/v5/feed.json";
pub const DEFAULT_FALLBACK_URL: &str = "https://bonusvarsler.github.io/feed/v5/feed.json";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub primary_url: String,
    /// Empty string disables the fallback source.
    pub fallback_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delays_ms: Vec<u64>,
    pub fallback_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delays_ms: DEFAULT_DELAYS_MS.to_vec(),
            fallback_attempts: DEFAULT_FALLBACK_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: DEFAULT_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/bonusvarsler/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("bonusvarsler").join("config.toml"))
    }

    pub fn sources(&self) -> FeedSources {
        let fallback = self.feed.fallback_url.trim();
        FeedSources {
            primary_url: self.feed.primary_url.clone(),
            fallback_url: (!fallback.is_empty()).then(|| fallback.to_string()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            delays: self
                .retry
                .delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            fallback_attempts: self.retry.fallback_attempts,
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache.ttl_hours.max(0))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        format!(
            r##"# bonusvarsler configuration

[feed]
# Merchant feed, tried first
primary_url = "{DEFAULT_PRIMARY_URL}"
# Tried after the primary source is exhausted; "" disables it
fallback_url = "{DEFAULT_FALLBACK_URL}"

[retry]
# Attempts against the primary source
max_retries = 5
# Sleep between attempts in milliseconds; the last value repeats
delays_ms = [100, 500, 1000, 2000, 4000]
# Attempts against the fallback source
fallback_attempts = 2

[cache]
# A cached feed older than this is fetched again
ttl_hours = 48

[storage]
# Database file (default: platform data directory)
# path = "/path/to/bonusvarsler.db"
"##
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

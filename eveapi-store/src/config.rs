//! Configuration management.

use crate::error::StoreError;
use crate::persistence::{default_config_path, default_http_cache_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// ESI settings.
    #[serde(default)]
    pub esi: EsiConfig,
    /// zKillboard settings.
    #[serde(default)]
    pub zkill: ZkillConfig,
    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Settings shared by every upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// User-Agent sent on every request; should name the app and a contact.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// ESI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsiConfig {
    /// Base URL, including the version segment.
    #[serde(default = "default_esi_base_url")]
    pub base_url: String,
    /// Lifetime of cached GET responses in hours.
    #[serde(default = "default_long_ttl_hours")]
    pub cache_ttl_hours: u64,
}

/// zKillboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZkillConfig {
    /// Base URL.
    #[serde(default = "default_zkill_base_url")]
    pub base_url: String,
    /// Highest feed page fetched per entity and direction.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Lifetime of closed-month pages and single killmails in hours.
    #[serde(default = "default_long_ttl_hours")]
    pub long_ttl_hours: u64,
    /// Lifetime of running-month pages in hours.
    #[serde(default = "default_short_ttl_hours")]
    pub short_ttl_hours: u64,
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Persist responses on disk; otherwise cache in memory for the process only.
    #[serde(default = "default_true")]
    pub persistent: bool,
    /// Cache directory; the platform cache directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_user_agent() -> String {
    format!("eveapi/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_esi_base_url() -> String {
    "https://esi.evetech.net/latest/".to_string()
}

fn default_zkill_base_url() -> String {
    "https://zkillboard.com".to_string()
}

fn default_max_pages() -> u32 {
    100
}

fn default_long_ttl_hours() -> u64 {
    770
}

fn default_short_ttl_hours() -> u64 {
    24
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            base_url: default_esi_base_url(),
            cache_ttl_hours: default_long_ttl_hours(),
        }
    }
}

impl Default for ZkillConfig {
    fn default() -> Self {
        Self {
            base_url: default_zkill_base_url(),
            max_pages: default_max_pages(),
            long_ttl_hours: default_long_ttl_hours(),
            short_ttl_hours: default_short_ttl_hours(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: true,
            dir: None,
        }
    }
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

impl GeneralConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EsiConfig {
    /// GET cache lifetime.
    pub fn cache_ttl(&self) -> Duration {
        hours(self.cache_ttl_hours)
    }
}

impl ZkillConfig {
    /// Closed-month page lifetime.
    pub fn long_ttl(&self) -> Duration {
        hours(self.long_ttl_hours)
    }

    /// Running-month page lifetime.
    pub fn short_ttl(&self) -> Duration {
        hours(self.short_ttl_hours)
    }
}

impl CacheConfig {
    /// The directory to use for the disk cache.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_http_cache_dir)
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.general.user_agent.trim().is_empty() {
            return Err(StoreError::Config("user_agent must not be empty".to_string()));
        }
        if self.zkill.max_pages == 0 {
            return Err(StoreError::Config("zkill.max_pages must be at least 1".to_string()));
        }
        let urls = [
            ("esi.base_url", &self.esi.base_url),
            ("zkill.base_url", &self.zkill.base_url),
        ];
        for (name, url) in urls {
            url::Url::parse(url).map_err(|e| StoreError::Config(format!("{name}: {e}")))?;
        }
        Ok(())
    }
}

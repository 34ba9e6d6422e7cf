//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (explicit path)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::load_or_default()`]) is a valid configuration.
//!
//! ```toml
//! [fetch]
//! ttl_ms = 300000
//! max_retries = 3
//! base_backoff_ms = 1000
//!
//! [cache]
//! max_entries = 1000
//!
//! [persistence]
//! enabled = true
//! max_age_ms = 86400000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::persisted::DEFAULT_MAX_AGE;
use crate::cache::store::default_cache_dir;
use crate::cache::{DEFAULT_CACHE_MAX, FileStore, PersistedCache};
use crate::types::{DEFAULT_BASE_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_TTL, FetchOptions};
use crate::{HuginnError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Default fetch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Cache validity window in milliseconds (default: 300000).
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Retries after the initial attempt (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds (default: 1000).
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Cap on a single backoff delay in milliseconds (default: none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,
    /// Start bound controllers immediately (default: true).
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: None,
            auto_start: true,
        }
    }
}

impl FetchConfig {
    /// Fetch options described by this section.
    pub fn options(&self) -> FetchOptions {
        let options = FetchOptions::new()
            .ttl(Duration::from_millis(self.ttl_ms))
            .max_retries(self.max_retries)
            .base_backoff(Duration::from_millis(self.base_backoff_ms))
            .auto_start(self.auto_start);
        match self.max_backoff_ms {
            Some(ms) => options.max_backoff(Duration::from_millis(ms)),
            None => options,
        }
    }
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL.as_millis() as u64
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_backoff_ms() -> u64 {
    DEFAULT_BASE_BACKOFF.as_millis() as u64
}

fn default_true() -> bool {
    true
}

/// In-memory cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries held in memory (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> u64 {
    DEFAULT_CACHE_MAX
}

/// On-disk persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether resolved payloads are written to disk (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory for persisted entries (default: `~/.cache/huginn`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Age in milliseconds after which a persisted entry is ignored
    /// (default: 86400000, one day).
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_age_ms: default_max_age_ms(),
        }
    }
}

fn default_max_age_ms() -> u64 {
    DEFAULT_MAX_AGE.as_millis() as u64
}

impl PersistenceConfig {
    /// Directory persisted entries live in.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// File-backed persistence described by this section, or `None` when
    /// disabled.
    pub fn build(&self) -> Option<PersistedCache> {
        if !self.enabled {
            return None;
        }
        let store = FileStore::new(self.resolved_dir());
        Some(PersistedCache::new(Arc::new(store)).max_age(Duration::from_millis(self.max_age_ms)))
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    /// Like [`load()`](Self::load), but falls back to defaults when no
    /// config file exists. An explicit path must still exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        if explicit_path.is_some() {
            return Self::load(explicit_path);
        }
        match Self::find_config_path() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::parse(&content).map_err(|e| match e {
            HuginnError::Configuration(msg) => {
                HuginnError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.fetch
            .options()
            .validate()
            .map_err(|e| HuginnError::Configuration(format!("[fetch] {e}")))?;
        if self.cache.max_entries == 0 {
            return Err(HuginnError::Configuration(
                "[cache] max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            HuginnError::Configuration(format!("Failed to serialize config: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Self::find_config_path().ok_or_else(|| {
            HuginnError::Configuration(
                "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                    .to_string(),
            )
        })
    }

    fn find_config_path() -> Option<PathBuf> {
        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.fetch.options(), FetchOptions::default());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config = Config::parse(
            r#"
            [fetch]
            max_retries = 2
            base_backoff_ms = 100

            [persistence]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.fetch.ttl_ms, 300_000);
        assert_eq!(
            config.fetch.options().base_backoff,
            Duration::from_millis(100)
        );
        assert!(!config.persistence.enabled);
        assert!(config.persistence.build().is_none());
        assert_eq!(config.cache.max_entries, 1_000);
    }

    #[test]
    fn max_backoff_carried_into_options() {
        let config = Config::parse("[fetch]\nmax_backoff_ms = 5000\n").unwrap();
        assert_eq!(
            config.fetch.options().max_backoff,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn zero_backoff_rejected() {
        let err = Config::parse("[fetch]\nbase_backoff_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("[fetch]"));
    }

    #[test]
    fn zero_cache_size_rejected() {
        assert!(Config::parse("[cache]\nmax_entries = 0\n").is_err());
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = Config::parse("[fetch\nttl_ms = ").unwrap_err();
        assert!(matches!(err, HuginnError::Configuration(_)));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/huginn.toml")));
        assert!(result.is_err());
        let result = Config::load_or_default(Some(Path::new("/nonexistent/huginn.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[persistence]\ndir = \"/var/cache/huginn\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.persistence.resolved_dir(),
            PathBuf::from("/var/cache/huginn")
        );
    }

    #[test]
    fn toml_rendering_parses_back() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("ttl_ms = 300000"));
        assert_eq!(Config::parse(&rendered).unwrap(), config);
    }
}

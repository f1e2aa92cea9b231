//! Configuration management for repopress
//!
//! [`Settings`] is the persisted preference set (credential, cache duration,
//! directories). [`HostEnvironment`] describes the running WordPress/PHP
//! versions the compatibility checks compare against.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CacheError, ConfigError, Result};

/// GitHub REST API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub web base URL (used for HTML scraping fallbacks)
pub const DEFAULT_WEB_BASE_URL: &str = "https://github.com";

/// Environment variable overriding the configured access token
pub const TOKEN_ENV: &str = "REPOPRESS_GITHUB_TOKEN";

/// Environment variable overriding the API base URL
pub const API_BASE_URL_ENV: &str = "REPOPRESS_API_BASE_URL";

/// Smallest and largest search page size GitHub results are shown in
pub const MIN_RESULTS_PER_PAGE: usize = 10;
pub const MAX_RESULTS_PER_PAGE: usize = 12;

/// Library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// GitHub personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// How long search results and repository data stay cached, in hours
    #[serde(default = "default_cache_duration_hours")]
    pub cache_duration_hours: u64,

    /// GitHub API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// GitHub web base URL
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,

    /// Search page size
    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,

    /// Interval between scheduled update checks, in hours
    #[serde(default = "default_update_interval_hours")]
    pub update_check_interval_hours: u64,

    /// Host plugins directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,

    /// Host themes directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes_dir: Option<PathBuf>,

    /// Cache directory (defaults to the platform cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

fn default_cache_duration_hours() -> u64 {
    12
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_web_base_url() -> String {
    DEFAULT_WEB_BASE_URL.to_string()
}

fn default_results_per_page() -> usize {
    MAX_RESULTS_PER_PAGE
}

fn default_update_interval_hours() -> u64 {
    24
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: None,
            cache_duration_hours: default_cache_duration_hours(),
            api_base_url: default_api_base_url(),
            web_base_url: default_web_base_url(),
            results_per_page: default_results_per_page(),
            update_check_interval_hours: default_update_interval_hours(),
            plugins_dir: None,
            themes_dir: None,
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::Invalid(
            "Could not determine config directory".to_string(),
        ))?;

        Ok(base.join("repopress").join("settings.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // The file holds a credential
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Apply `REPOPRESS_*` environment overrides.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token.trim().to_string());
        }
        if let Some(url) = lookup(API_BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.cache_duration_hours == 0 {
            return Err(
                ConfigError::Invalid("cache_duration_hours must be at least 1".to_string()).into(),
            );
        }
        if self.update_check_interval_hours == 0 {
            return Err(ConfigError::Invalid(
                "update_check_interval_hours must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Non-empty access token, if configured
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// TTL for cached GitHub data
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_duration_hours.max(1) * 60 * 60)
    }

    /// Interval between scheduled update checks
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_check_interval_hours.max(1) * 60 * 60)
    }

    /// Search page size clamped to the supported range
    pub fn page_size(&self) -> usize {
        self.results_per_page
            .clamp(MIN_RESULTS_PER_PAGE, MAX_RESULTS_PER_PAGE)
    }

    /// Resolved cache directory
    pub fn resolved_cache_dir(&self) -> std::result::Result<PathBuf, CacheError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir().ok_or(CacheError::NoHome)?.join("repopress")),
        }
    }
}

/// Host key-value settings collaborator
pub trait SettingsStore: Send + Sync {
    /// Configured access token, if any
    fn access_token(&self) -> Option<String>;

    /// Replace (or clear) the access token and persist it
    fn set_access_token(&mut self, token: Option<String>) -> Result<()>;

    /// Cache duration preference
    fn cache_duration(&self) -> Duration;
}

/// [`SettingsStore`] persisted as a YAML file
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl FileSettingsStore {
    /// Open the store at `path`, starting from defaults when the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match Settings::load_from(&path) {
            Ok(settings) => settings,
            Err(crate::error::Error::Config(ConfigError::NotFound)) => Settings::default(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl SettingsStore for FileSettingsStore {
    fn access_token(&self) -> Option<String> {
        self.settings.token().map(str::to_string)
    }

    fn set_access_token(&mut self, token: Option<String>) -> Result<()> {
        self.settings.access_token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.settings.save_to(&self.path)
    }

    fn cache_duration(&self) -> Duration {
        self.settings.cache_ttl()
    }
}

/// Versions of the running host, compared against package requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEnvironment {
    /// WordPress version
    pub host_version: String,

    /// PHP version
    pub runtime_version: String,
}

impl HostEnvironment {
    pub fn new(host_version: impl Into<String>, runtime_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
            runtime_version: runtime_version.into(),
        }
    }
}

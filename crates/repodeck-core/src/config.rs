use repodeck_api::{RetryConfig, GITHUB_API_BASE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from the config file; CLI flags and env vars are layered on top
/// by the binary. Priority: CLI > Env > File > Defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub contributors: ContributorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::parse(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// `<config dir>/repodeck/config.toml` (XDG on Linux, AppData on Windows)
    pub fn config_path() -> crate::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("repodeck")
            .join("config.toml"))
    }

    /// Where favorites and the theme live
    pub fn store_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }

        Ok(dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("repodeck")
            .join("store.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token; raises the search quota considerably
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,
}

fn default_github_url() -> String {
    GITHUB_API_BASE.to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_page_size")]
    pub page_size: u32,

    /// Quiet period before typed text becomes a query
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_search_page_size() -> u32 {
    10
}

fn default_debounce_ms() -> u64 {
    500
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_search_page_size(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorConfig {
    #[serde(default = "default_contributor_page_size")]
    pub page_size: u32,
}

fn default_contributor_page_size() -> u32 {
    20
}

impl Default for ContributorConfig {
    fn default() -> Self {
        Self {
            page_size: default_contributor_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite file
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    RetryConfig::default().max_retries
}

fn default_initial_delay_ms() -> u64 {
    RetryConfig::default().initial_delay_ms
}

fn default_max_delay_ms() -> u64 {
    RetryConfig::default().max_delay_ms
}

fn default_backoff_multiplier() -> f64 {
    RetryConfig::default().backoff_multiplier
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_retries: settings.max_retries,
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_multiplier: settings.backoff_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.page_size, 10);
        assert_eq!(config.search.debounce(), Duration::from_millis(500));
        assert_eq!(config.contributors.page_size, 20);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.github.token.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [search]
            page_size = 25

            [storage]
            path = "/tmp/repodeck.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.search.page_size, 25);
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.contributors.page_size, 20);
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/tmp/repodeck.db")
        );
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::parse("search = [").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigError(_)));
    }

    #[test]
    fn test_config_serialization() {
        let toml = toml::to_string(&Config::default()).unwrap();
        assert!(toml.contains("page_size"));
        assert!(toml.contains("debounce_ms"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.search.page_size, 10);
    }
}

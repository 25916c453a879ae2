//! Configuration Management
//!
//! Settings are layered: CLI flag > environment variable > config file >
//! built-in default. Flags and environment variables are handled by clap and
//! arrive here as a [`Config`] merged over the file's.

use crate::probe::{ProbeConfig, DEFAULT_HEALTH_ENDPOINTS};
use crate::resource::SyncConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_TARGET_URL: &str = "http://localhost:7280";
pub const DEFAULT_MAX_RETRIES: u32 = 30;
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 5;
pub const DEFAULT_SETTLE_DELAY_SECONDS: u64 = 5;
pub const DEFAULT_APPLY_PAUSE_MILLIS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_INDEX_DEFINITIONS_DIR: &str = "./config/indexes";

/// Partial configuration, as found in a config file or on the command line
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target_url: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub settle_delay_seconds: Option<u64>,
    pub apply_pause_millis: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub index_definitions_dir: Option<PathBuf>,
    pub source_definitions_dir: Option<PathBuf>,
    /// Health endpoint paths, probed in order
    pub health_endpoints: Option<Vec<String>>,
    pub dry_run: Option<bool>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub target_url: Url,
    pub probe: ProbeConfig,
    pub settle_delay: Duration,
    pub request_timeout: Duration,
    pub sync: SyncConfig,
    pub index_definitions_dir: PathBuf,
    pub source_definitions_dir: PathBuf,
}

impl Config {
    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("qwinit").join("config.json"))
    }

    /// Load a config file
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// present, otherwise an empty config is returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::parse(&path, &content)
    }

    /// Parse config content, choosing YAML or JSON by extension
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            serde_yaml::from_str(content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        }
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(self, other: Config) -> Config {
        Config {
            target_url: other.target_url.or(self.target_url),
            max_retries: other.max_retries.or(self.max_retries),
            retry_delay_seconds: other.retry_delay_seconds.or(self.retry_delay_seconds),
            settle_delay_seconds: other.settle_delay_seconds.or(self.settle_delay_seconds),
            apply_pause_millis: other.apply_pause_millis.or(self.apply_pause_millis),
            request_timeout_seconds: other
                .request_timeout_seconds
                .or(self.request_timeout_seconds),
            index_definitions_dir: other.index_definitions_dir.or(self.index_definitions_dir),
            source_definitions_dir: other
                .source_definitions_dir
                .or(self.source_definitions_dir),
            health_endpoints: other.health_endpoints.or(self.health_endpoints),
            dry_run: other.dry_run.or(self.dry_run),
        }
    }

    /// Get effective target URL
    pub fn effective_target_url(&self) -> Result<Url> {
        let raw = self.target_url.as_deref().unwrap_or(DEFAULT_TARGET_URL);
        let url = Url::parse(raw).with_context(|| format!("Invalid target URL '{}'", raw))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "Target URL must use http or https, got '{}'",
                url.scheme()
            ));
        }
        Ok(url)
    }

    /// Get effective index definitions directory
    pub fn effective_index_dir(&self) -> PathBuf {
        self.index_definitions_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DEFINITIONS_DIR))
    }

    /// Get effective source definitions directory (defaults under the index directory)
    pub fn effective_source_dir(&self) -> PathBuf {
        self.source_definitions_dir
            .clone()
            .unwrap_or_else(|| self.effective_index_dir().join("sources"))
    }

    /// Resolve into validated settings
    pub fn resolve(&self) -> Result<Settings> {
        let request_timeout = Duration::from_secs(
            self.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        );
        if request_timeout.is_zero() {
            return Err(anyhow::anyhow!("Request timeout must be greater than zero"));
        }

        let endpoints = self.health_endpoints.clone().unwrap_or_else(|| {
            DEFAULT_HEALTH_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        if endpoints.is_empty() {
            return Err(anyhow::anyhow!("At least one health endpoint is required"));
        }

        Ok(Settings {
            target_url: self.effective_target_url()?,
            probe: ProbeConfig {
                endpoints,
                max_attempts: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                delay: Duration::from_secs(
                    self.retry_delay_seconds
                        .unwrap_or(DEFAULT_RETRY_DELAY_SECONDS),
                ),
            },
            settle_delay: Duration::from_secs(
                self.settle_delay_seconds
                    .unwrap_or(DEFAULT_SETTLE_DELAY_SECONDS),
            ),
            request_timeout,
            sync: SyncConfig {
                apply_pause: Duration::from_millis(
                    self.apply_pause_millis.unwrap_or(DEFAULT_APPLY_PAUSE_MILLIS),
                ),
                dry_run: self.dry_run.unwrap_or(false),
            },
            index_definitions_dir: self.effective_index_dir(),
            source_definitions_dir: self.effective_source_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Config::default().resolve().unwrap();

        assert_eq!(settings.target_url.as_str(), "http://localhost:7280/");
        assert_eq!(settings.probe.max_attempts, 30);
        assert_eq!(settings.probe.delay, Duration::from_secs(5));
        assert_eq!(settings.settle_delay, Duration::from_secs(5));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.sync.apply_pause, Duration::from_millis(1000));
        assert!(!settings.sync.dry_run);
        assert_eq!(
            settings.source_definitions_dir,
            PathBuf::from("./config/indexes").join("sources")
        );
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let file = Config {
            target_url: Some("http://from-file:7280".into()),
            max_retries: Some(5),
            ..Default::default()
        };
        let cli = Config {
            target_url: Some("http://from-cli:7280".into()),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.target_url.as_deref(), Some("http://from-cli:7280"));
        assert_eq!(merged.max_retries, Some(5));
    }

    #[test]
    fn test_source_dir_follows_index_dir() {
        let config = Config {
            index_definitions_dir: Some(PathBuf::from("/quickwit/indexes")),
            ..Default::default()
        };
        assert_eq!(
            config.effective_source_dir(),
            PathBuf::from("/quickwit/indexes/sources")
        );
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse(
            Path::new("qwinit.yaml"),
            "target_url: http://quickwit:7280\nmax_retries: 12\n",
        )
        .unwrap();
        assert_eq!(yaml.max_retries, Some(12));

        let json = Config::parse(
            Path::new("qwinit.json"),
            r#"{"health_endpoints": ["/health/livez"], "dry_run": true}"#,
        )
        .unwrap();
        assert_eq!(json.health_endpoints, Some(vec!["/health/livez".to_string()]));
        assert_eq!(json.dry_run, Some(true));
    }

    #[test]
    fn test_unknown_config_keys_are_rejected() {
        assert!(Config::parse(Path::new("c.json"), r#"{"target": "x"}"#).is_err());
    }

    #[test]
    fn test_invalid_settings() {
        let bad_url = Config {
            target_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(bad_url.resolve().is_err());

        let bad_scheme = Config {
            target_url: Some("ftp://quickwit".into()),
            ..Default::default()
        };
        assert!(bad_scheme.resolve().is_err());

        let no_endpoints = Config {
            health_endpoints: Some(Vec::new()),
            ..Default::default()
        };
        assert!(no_endpoints.resolve().is_err());

        let zero_timeout = Config {
            request_timeout_seconds: Some(0),
            ..Default::default()
        };
        assert!(zero_timeout.resolve().is_err());
    }

    #[test]
    fn test_explicit_missing_config_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/qwinit.json"))).is_err());
    }
}

//! Static configuration loaded once at startup.
//!
//! The configuration is a YAML document with five sections. Every key has a
//! default, so an empty (or missing) file yields a working setup that polls
//! the public Hacker News API and uploads to a local endpoint.
//!
//! ```yaml
//! source:
//!   name: "Hacker News"
//!   base: "https://hacker-news.firebaseio.com/v0/"
//!   top_stories: "topstories.json"
//!   item: "item/{id}.json"
//!   timeout_ms: 10000
//!   follow_redirect: true
//!   max_redirects: 10
//! request:
//!   retries: 5
//!   interval_secs: 300
//!   batch_size: 30
//!   success: [200, 201, 202, 204, 304]
//! upload:
//!   url: "http://localhost:3000/api/stories"
//! ledger:
//!   dir: "data"
//!   filename: "seen_stories.json"
//! logger:
//!   level: "info"
//!   file_level: "info"
//!   dir: "logs"
//! ```

use crate::error::{MinerError, Result};
use crate::models::StoryId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Placeholder replaced by the story id in [`SourceConfig::item`].
const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub request: RequestConfig,
    pub upload: UploadConfig,
    pub ledger: LedgerConfig,
    pub logger: LoggerConfig,
}

/// Where stories come from and how the feed is requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Human-readable tag stamped on every upload record.
    pub name: String,
    pub base: String,
    pub top_stories: String,
    /// Item path relative to `base`; `{id}` is replaced by the story id.
    pub item: String,
    pub timeout_ms: u64,
    pub follow_redirect: bool,
    pub max_redirects: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "Hacker News".to_string(),
            base: "https://hacker-news.firebaseio.com/v0/".to_string(),
            top_stories: "topstories.json".to_string(),
            item: "item/{id}.json".to_string(),
            timeout_ms: 10_000,
            follow_redirect: true,
            max_redirects: 10,
        }
    }
}

/// Polling cadence, batch limits and the retry budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Consecutive top-stories failures tolerated before the job halts.
    pub retries: u32,
    pub interval_secs: u64,
    pub batch_size: usize,
    /// Status codes treated as a successful response.
    pub success: Vec<u16>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            interval_secs: 300,
            batch_size: 30,
            success: vec![200, 201, 202, 204, 304],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000/api/stories".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub dir: PathBuf,
    pub filename: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            filename: "seen_stories.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Console `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// `EnvFilter` directive for the rotating log file.
    pub file_level: String,
    /// Directory of the daily log files, created at startup.
    pub dir: PathBuf,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_level: "info".to_string(),
            dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - The file to read, or `None` to use the built-in defaults
    ///
    /// # Returns
    ///
    /// The parsed configuration. It is not validated yet, so command-line
    /// overrides can be applied before calling [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`MinerError::Config`] if the file cannot be read or is not
    /// valid YAML for this layout.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    MinerError::Config(format!("reading {}: {e}", path.display()))
                })?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => {
                info!("No configuration file given; using defaults");
                Self::default()
            }
        };
        Ok(config)
    }

    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| MinerError::Config(e.to_string()))
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.top_stories_url()?;
        self.upload_url()?;
        if !self.source.item.contains(ID_PLACEHOLDER) {
            return Err(MinerError::Config(format!(
                "source.item {:?} has no {ID_PLACEHOLDER} placeholder",
                self.source.item
            )));
        }
        if self.source.timeout_ms == 0 {
            return Err(MinerError::Config(
                "source.timeout_ms must be positive".into(),
            ));
        }
        if self.request.interval_secs == 0 {
            return Err(MinerError::Config(
                "request.interval_secs must be positive".into(),
            ));
        }
        if self.request.batch_size == 0 {
            return Err(MinerError::Config(
                "request.batch_size must be positive".into(),
            ));
        }
        if self.request.success.is_empty() {
            return Err(MinerError::Config(
                "request.success must list at least one status".into(),
            ));
        }
        if self.ledger.filename.trim().is_empty() {
            return Err(MinerError::Config("ledger.filename is empty".into()));
        }
        Ok(())
    }

    pub fn top_stories_url(&self) -> Result<Url> {
        join_url(&self.base_url()?, &self.source.top_stories)
    }

    pub fn item_url(&self, id: StoryId) -> Result<Url> {
        let path = self.source.item.replace(ID_PLACEHOLDER, &id.to_string());
        join_url(&self.base_url()?, &path)
    }

    pub fn upload_url(&self) -> Result<Url> {
        parse_url(&self.upload.url)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger.dir.join(&self.ledger.filename)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.request.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.source.timeout_ms)
    }

    pub fn is_success(&self, status: u16) -> bool {
        self.request.success.contains(&status)
    }

    /// The feed base with a guaranteed trailing slash, so relative joins
    /// append instead of replacing the last path segment.
    fn base_url(&self) -> Result<Url> {
        let base = &self.source.base;
        if base.ends_with('/') {
            parse_url(base)
        } else {
            parse_url(&format!("{base}/"))
        }
    }
}

fn parse_url(input: &str) -> Result<Url> {
    Url::parse(input).map_err(|source| MinerError::Url {
        input: input.to_string(),
        source,
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|source| MinerError::Url {
        input: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.source.name, "Hacker News");
        assert_eq!(config.request.retries, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let yaml = r#"
source:
  name: "HN"
request:
  retries: 2
  batch_size: 3
ledger:
  dir: "/tmp/miner"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.name, "HN");
        assert_eq!(config.source.top_stories, "topstories.json");
        assert_eq!(config.request.retries, 2);
        assert_eq!(config.request.batch_size, 3);
        assert_eq!(config.request.interval_secs, 300);
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("/tmp/miner/seen_stories.json")
        );
    }

    #[test]
    fn test_urls_join_against_base() {
        let mut config = Config::default();
        config.source.base = "https://hacker-news.firebaseio.com/v0".to_string();
        assert_eq!(
            config.top_stories_url().unwrap().as_str(),
            "https://hacker-news.firebaseio.com/v0/topstories.json"
        );
        assert_eq!(
            config.item_url(8863).unwrap().as_str(),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.request.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.request.success.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(MinerError::Url { .. })));

        let mut config = Config::default();
        config.source.item = "item.json".to_string();
        assert!(matches!(config.validate(), Err(MinerError::Config(_))));

        let mut config = Config::default();
        config.source.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(MinerError::Config(msg)) if msg.contains("timeout_ms")));
    }

    #[test]
    fn test_logger_section() {
        let defaults = Config::default();
        assert_eq!(defaults.logger.dir, PathBuf::from("logs"));
        assert_eq!(defaults.logger.file_level, "info");

        let yaml = "logger:\n  dir: \"/var/log/miner\"\n  file_level: \"debug\"\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.logger.dir, PathBuf::from("/var/log/miner"));
        assert_eq!(config.logger.file_level, "debug");
        assert_eq!(config.logger.level, "info");
    }

    #[test]
    fn test_success_set_lookup() {
        let config = Config::default();
        assert!(config.is_success(200));
        assert!(!config.is_success(500));
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_shipped_sample_matches_defaults() {
        let sample = Config::from_yaml(include_str!("../config/default.yaml")).unwrap();
        let defaults = Config::default();
        assert_eq!(sample.source.base, defaults.source.base);
        assert_eq!(sample.source.item, defaults.source.item);
        assert_eq!(sample.request.success, defaults.request.success);
        assert_eq!(sample.ledger_path(), defaults.ledger_path());
        assert_eq!(sample.logger.dir, defaults.logger.dir);
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Config::from_yaml("request: [unterminated").unwrap_err();
        assert!(matches!(err, MinerError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.yaml");
        std::fs::write(&path, "upload:\n  url: \"https://ingest.example.com/v1\"\n").unwrap();
        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.upload_url().unwrap().host_str(), Some("ingest.example.com"));
    }

    #[tokio::test]
    async fn test_load_leaves_validation_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.yaml");
        std::fs::write(&path, "upload:\n  url: \"not a url\"\n").unwrap();
        let mut config = Config::load(Some(&path)).await.unwrap();
        assert!(config.validate().is_err());

        config.upload.url = "https://ingest.example.com/v1".to_string();
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.yaml"))).await.unwrap_err();
        assert!(matches!(err, MinerError::Config(_)));
    }
}

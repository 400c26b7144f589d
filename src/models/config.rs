//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Placeholder replaced by the plugin id in `endpoints.detail_url`.
pub const PLUGIN_PLACEHOLDER: &str = "{plugin}";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream API locations
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Persistence backend settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override storage settings from `MONGO_URI`, `MONGO_DATABASE` and
    /// `MONGO_COLLECTION`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override storage settings from any key/value source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let storage = &mut self.storage;
        for (key, slot) in [
            ("MONGO_URI", &mut storage.mongo_uri),
            ("MONGO_DATABASE", &mut storage.database),
            ("MONGO_COLLECTION", &mut storage.collection),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                log::debug!("{} overridden from environment", key);
                *slot = value;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.feed_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.feed_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }

        for (name, value) in [
            ("endpoints.feed_url", &self.endpoints.feed_url),
            ("endpoints.search_url", &self.endpoints.search_url),
            ("endpoints.detail_url", &self.endpoints.detail_url),
        ] {
            Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} '{value}': {e}")))?;
        }
        if !self.endpoints.detail_url.contains(PLUGIN_PLACEHOLDER) {
            return Err(AppError::validation(format!(
                "endpoints.detail_url must contain {PLUGIN_PLACEHOLDER}"
            )));
        }

        match self.storage.backend {
            StorageBackend::Mongo => {
                if self.storage.mongo_uri.trim().is_empty() {
                    return Err(AppError::validation("storage.mongo_uri is empty"));
                }
                if self.storage.database.trim().is_empty() {
                    return Err(AppError::validation("storage.database is empty"));
                }
                if self.storage.collection.trim().is_empty() {
                    return Err(AppError::validation("storage.collection is empty"));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_dir.as_os_str().is_empty() {
                    return Err(AppError::validation("storage.local_dir is empty"));
                }
            }
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Longer timeout for the bulk feed download
    #[serde(default = "defaults::feed_timeout")]
    pub feed_timeout_secs: u64,

    /// Delay between completed detail fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            feed_timeout_secs: defaults::feed_timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Upstream endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Gzip-compressed XML plugin feed
    #[serde(default = "defaults::feed_url")]
    pub feed_url: String,

    /// Paginated plugin search
    #[serde(default = "defaults::search_url")]
    pub search_url: String,

    /// Per-plugin detail; `{plugin}` is replaced by the id
    #[serde(default = "defaults::detail_url")]
    pub detail_url: String,
}

impl EndpointConfig {
    /// Detail URL for one plugin.
    pub fn detail_url_for(&self, id: impl std::fmt::Display) -> String {
        self.detail_url
            .replace(PLUGIN_PLACEHOLDER, &id.to_string())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            feed_url: defaults::feed_url(),
            search_url: defaults::search_url(),
            detail_url: defaults::detail_url(),
        }
    }
}

/// Which persistence backend receives plugin records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Local,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// MongoDB connection string
    #[serde(default = "defaults::mongo_uri")]
    pub mongo_uri: String,

    /// MongoDB database name
    #[serde(default = "defaults::database")]
    pub database: String,

    /// MongoDB collection name
    #[serde(default = "defaults::collection")]
    pub collection: String,

    /// Root directory for the local JSON backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            mongo_uri: defaults::mongo_uri(),
            database: defaults::database(),
            collection: defaults::collection(),
            local_dir: defaults::local_dir(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Log every stored plugin at info level instead of debug
    #[serde(default)]
    pub log_scraped_items: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            log_scraped_items: false,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; plugin-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn feed_timeout() -> u64 {
        300
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        16
    }

    // Endpoint defaults
    pub fn feed_url() -> String {
        "https://plugins.nessus.org/plugins_rba.xml.gz".into()
    }
    pub fn search_url() -> String {
        "https://www.tenable.com/plugins/api/v1/search".into()
    }
    pub fn detail_url() -> String {
        "https://www.tenable.com/plugins/api/v1/nessus/{plugin}".into()
    }

    // Storage defaults
    pub fn mongo_uri() -> String {
        "mongodb://localhost:27017".into()
    }
    pub fn database() -> String {
        "tenable".into()
    }
    pub fn collection() -> String {
        "plugins".into()
    }
    pub fn local_dir() -> PathBuf {
        PathBuf::from("storage")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

//! Configuration for the report client

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default API base used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/";

/// Actor identifier the report backend expects from this deployment
pub const DEFAULT_ACTOR_ID: &str = "noventiqteam_123";

/// Query parameter the search backend reads the user's text from
pub const DEFAULT_SEARCH_QUERY_PARAM: &str = "_q";

/// Configuration for report acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API; the report endpoint is the base itself
    pub api_base_url: Url,

    /// Name of the search query parameter
    pub search_query_param: String,

    /// Actor identifier sent with every report request
    pub actor_id: String,

    /// Quiet period before a search is dispatched
    pub search_debounce: Duration,

    /// Minimum query length, in characters, that triggers a search
    pub min_query_len: usize,

    /// Number of recent lookups kept
    pub history_capacity: usize,

    /// File holding the persisted recent-search list
    pub history_path: PathBuf,

    /// Timeout for search and report-document requests
    pub request_timeout: Duration,

    /// Timeout for report generation, which runs an analysis agent server-side
    pub report_timeout: Duration,

    /// Directory downloaded reports are written to
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            search_query_param: DEFAULT_SEARCH_QUERY_PARAM.to_string(),
            actor_id: DEFAULT_ACTOR_ID.to_string(),
            search_debounce: Duration::from_millis(300),
            min_query_len: 2,
            history_capacity: 5,
            history_path: equityx_utils::default_history_path(),
            request_timeout: Duration::from_secs(30),
            report_timeout: Duration::from_secs(900), // 15 minutes
            download_dir: PathBuf::from("."),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

/// Parse a base URL, appending the trailing slash `Url::join` needs to keep
/// the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw)
        .map_err(|e| ReportError::Config(format!("Invalid API base URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ReportError::Config(format!(
            "API base URL '{raw}' cannot be used as a base"
        )));
    }
    Ok(url)
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Apply `EQUITYX_*` environment overrides
    pub fn with_env(self) -> Result<Self> {
        ClientConfigBuilder::from(self).with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.cannot_be_a_base() {
            return Err(ReportError::Config(
                "api_base_url cannot be used as a base".to_string(),
            ));
        }

        if self.search_query_param.trim().is_empty() {
            return Err(ReportError::Config(
                "search_query_param must not be empty".to_string(),
            ));
        }

        if self.actor_id.trim().is_empty() {
            return Err(ReportError::Config("actor_id must not be empty".to_string()));
        }

        if self.min_query_len == 0 {
            return Err(ReportError::Config(
                "min_query_len must be greater than 0".to_string(),
            ));
        }

        if self.history_capacity == 0 {
            return Err(ReportError::Config(
                "history_capacity must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.report_timeout.is_zero() {
            return Err(ReportError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Search endpoint, `<base>search`
    pub fn search_url(&self) -> Result<Url> {
        self.endpoint("search")
    }

    /// Login endpoint, `<base>login`
    pub fn login_url(&self) -> Result<Url> {
        self.endpoint("login")
    }

    /// Report generation endpoint
    pub fn report_url(&self) -> Url {
        self.api_base_url.clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path)
            .map_err(|e| ReportError::Config(format!("Invalid {path} endpoint: {e}")))
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_base_url: Option<String>,
    search_query_param: Option<String>,
    actor_id: Option<String>,
    search_debounce: Option<Duration>,
    min_query_len: Option<usize>,
    history_capacity: Option<usize>,
    history_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    report_timeout: Option<Duration>,
    download_dir: Option<PathBuf>,
}

impl From<ClientConfig> for ClientConfigBuilder {
    fn from(config: ClientConfig) -> Self {
        Self {
            api_base_url: Some(config.api_base_url.to_string()),
            search_query_param: Some(config.search_query_param),
            actor_id: Some(config.actor_id),
            search_debounce: Some(config.search_debounce),
            min_query_len: Some(config.min_query_len),
            history_capacity: Some(config.history_capacity),
            history_path: Some(config.history_path),
            request_timeout: Some(config.request_timeout),
            report_timeout: Some(config.report_timeout),
            download_dir: Some(config.download_dir),
        }
    }
}

impl ClientConfigBuilder {
    /// Set the API base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the search query parameter name
    pub fn search_query_param(mut self, param: impl Into<String>) -> Self {
        self.search_query_param = Some(param.into());
        self
    }

    /// Set the actor identifier
    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the search debounce delay
    pub fn search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = Some(delay);
        self
    }

    /// Set the minimum query length
    pub fn min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = Some(len);
        self
    }

    /// Set how many recent lookups are kept
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Set the history file
    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// Set the search/document request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the report generation timeout
    pub fn report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = Some(timeout);
        self
    }

    /// Set the download directory
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Load overrides from `EQUITYX_*` environment variables
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("EQUITYX_API_URL") {
            self.api_base_url = Some(url);
        }
        if let Ok(param) = std::env::var("EQUITYX_SEARCH_PARAM") {
            self.search_query_param = Some(param);
        }
        if let Ok(actor_id) = std::env::var("EQUITYX_ACTOR_ID") {
            self.actor_id = Some(actor_id);
        }
        if let Ok(path) = std::env::var("EQUITYX_HISTORY_PATH") {
            self.history_path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var("EQUITYX_DOWNLOAD_DIR") {
            self.download_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let api_base_url = match self.api_base_url {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.api_base_url,
        };

        let config = ClientConfig {
            api_base_url,
            search_query_param: self.search_query_param.unwrap_or(defaults.search_query_param),
            actor_id: self.actor_id.unwrap_or(defaults.actor_id),
            search_debounce: self.search_debounce.unwrap_or(defaults.search_debounce),
            min_query_len: self.min_query_len.unwrap_or(defaults.min_query_len),
            history_capacity: self.history_capacity.unwrap_or(defaults.history_capacity),
            history_path: self.history_path.unwrap_or(defaults.history_path),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            report_timeout: self.report_timeout.unwrap_or(defaults.report_timeout),
            download_dir: self.download_dir.unwrap_or(defaults.download_dir),
        };

        config.validate()?;
        Ok(config)
    }
}

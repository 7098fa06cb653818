//! Configuration management for the matrikkel harvester
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transform::WGS84_GEOGRAPHIC;

/// Upper bound on `max_retries`; backoff doubles per attempt
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream endpoints
    pub sources: SourcesConfig,

    /// HTTP client configuration
    pub http: HttpConfig,

    /// Headless browser configuration
    pub browser: BrowserConfig,

    /// What to harvest and where to write it
    pub harvest: HarvestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Upstream endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Grouped-address search endpoint
    pub address_api_url: String,

    /// Cadastral search endpoint
    pub cadastral_api_url: String,

    /// Base of the property detail page; the cadastral path is appended
    pub detail_base_url: String,

    /// Map viewer linked from every output row
    pub map_viewer_url: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries for transient failures
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,
}

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium)
    pub webdriver_url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Upper bound on waiting for the details panel, in seconds
    pub wait_timeout_secs: u64,

    /// WebDriver page load strategy (`none`, `eager`, `normal`)
    pub page_load_strategy: String,
}

/// Cadastral search ambiguity handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Warn and keep the first candidate
    #[default]
    First,
    /// Fail the address
    Reject,
}

impl AmbiguityPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Some(Self::First),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Harvest scope and output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Municipality names, matched case-insensitively
    pub municipalities: Vec<String>,

    /// Postal-code reference table (xlsx, ods, csv, tsv, txt)
    pub postal_table: PathBuf,

    /// Category code selecting street-address postal codes
    pub category: String,

    /// Addresses requested per page from the address API
    pub page_size: u32,

    /// Upper bound on pages per postal area
    pub max_pages: u32,

    /// Process only the first N addresses
    pub limit: Option<usize>,

    /// Full (non-deduplicated) output table
    pub output: PathBuf,

    /// Optional deduplicated output table
    pub dedup_output: Option<PathBuf>,

    /// Report full failure detail per address
    pub verbose: bool,

    /// What to do with ambiguous cadastral matches
    pub ambiguity: AmbiguityPolicy,

    /// Target reference system for latitude/longitude
    pub target_epsg: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            address_api_url: String::from(
                "https://adressesok.posten.no/api/v1/grouped_addresses.json",
            ),
            cadastral_api_url: String::from("https://seeiendom.kartverket.no/api/soekEtterEiendom"),
            detail_base_url: String::from("https://seeiendom.kartverket.no/eiendom"),
            map_viewer_url: String::from("https://norgeskart.no/"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            request_timeout_secs: 30,
            max_retries: 3,
            user_agent: format!("matrikkel/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: String::from("http://localhost:4444"),
            headless: true,
            wait_timeout_secs: 5,
            page_load_strategy: String::from("none"),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            municipalities: vec![String::from("strand")],
            postal_table: PathBuf::from("postnummer.xlsx"),
            category: String::from("G"),
            page_size: 10_000,
            max_pages: 20,
            limit: None,
            output: PathBuf::from("data.csv"),
            dedup_output: None,
            verbose: true,
            ambiguity: AmbiguityPolicy::First,
            target_epsg: 4326,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional and falls back to [`Config::default`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("MATRIKKEL_ADDRESS_API_URL") {
            config.sources.address_api_url = v;
        }
        if let Ok(v) = std::env::var("MATRIKKEL_CADASTRAL_API_URL") {
            config.sources.cadastral_api_url = v;
        }
        if let Ok(v) = std::env::var("MATRIKKEL_DETAIL_BASE_URL") {
            config.sources.detail_base_url = v;
        }

        if let Some(v) = env_parsed("MATRIKKEL_RATE_LIMIT") {
            config.http.requests_per_second = v;
        }
        if let Some(v) = env_parsed("MATRIKKEL_REQUEST_TIMEOUT") {
            config.http.request_timeout_secs = v;
        }
        if let Some(v) = env_parsed("MATRIKKEL_MAX_RETRIES") {
            config.http.max_retries = v;
        }
        if let Ok(v) = std::env::var("MATRIKKEL_USER_AGENT") {
            config.http.user_agent = v;
        }

        if let Ok(v) = std::env::var("MATRIKKEL_WEBDRIVER_URL") {
            config.browser.webdriver_url = v;
        }
        if let Some(v) = env_parsed("MATRIKKEL_WAIT_TIMEOUT") {
            config.browser.wait_timeout_secs = v;
        }

        if let Ok(v) = std::env::var("MATRIKKEL_MUNICIPALITIES") {
            config.harvest.municipalities = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("MATRIKKEL_POSTAL_TABLE") {
            config.harvest.postal_table = v.into();
        }
        if let Ok(v) = std::env::var("MATRIKKEL_OUTPUT") {
            config.harvest.output = v.into();
        }
        if let Some(v) = env_parsed("MATRIKKEL_LIMIT") {
            config.harvest.limit = Some(v);
        }
        if let Ok(v) = std::env::var("MATRIKKEL_AMBIGUITY") {
            config.harvest.ambiguity = AmbiguityPolicy::parse(&v)
                .with_context(|| format!("Invalid MATRIKKEL_AMBIGUITY value: {v}"))?;
        }

        if let Ok(v) = std::env::var("MATRIKKEL_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("MATRIKKEL_LOG_FORMAT") {
            config.logging.format = v;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.http.max_retries > MAX_RETRIES_LIMIT {
            anyhow::bail!(
                "max_retries must be at most {MAX_RETRIES_LIMIT} (got {})",
                self.http.max_retries
            );
        }

        if self.browser.wait_timeout_secs == 0 {
            anyhow::bail!("wait_timeout_secs must be greater than 0");
        }

        if !matches!(
            self.browser.page_load_strategy.as_str(),
            "none" | "eager" | "normal"
        ) {
            anyhow::bail!(
                "page_load_strategy must be one of none, eager, normal (got '{}')",
                self.browser.page_load_strategy
            );
        }

        if self.harvest.municipalities.is_empty() {
            anyhow::bail!("at least one municipality is required");
        }

        if self.harvest.category.trim().is_empty() {
            anyhow::bail!("category must not be empty");
        }

        if self.harvest.page_size == 0 || self.harvest.max_pages == 0 {
            anyhow::bail!("page_size and max_pages must be greater than 0");
        }

        if self.harvest.target_epsg != WGS84_GEOGRAPHIC {
            anyhow::bail!(
                "target_epsg must be {WGS84_GEOGRAPHIC} (got {})",
                self.harvest.target_epsg
            );
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Get details-panel wait bound as Duration
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.browser.wait_timeout_secs)
    }
}

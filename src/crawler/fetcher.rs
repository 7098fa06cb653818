//! JSON API fetcher with rate limiting and retry
//!
//! Both upstream APIs (address search and cadastral search) are plain HTTP GET
//! endpoints returning JSON. This fetcher gives them:
//! - Sequential pacing with governor
//! - Automatic retry with exponential backoff on transient failures
//! - A per-request timeout
//! - Typed JSON decoding with the offending URL kept in the error

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::config::HttpConfig;
use crate::utils::error::FetchError;

/// Rate-limited JSON fetcher shared by the address and cadastral resolvers
pub struct ApiFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    user_agent: String,
}

impl ApiFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 3, Duration::from_secs(30))
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            max_retries,
            base_delay_ms: 500,
            user_agent: format!("matrikkel/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Create a fetcher from the `[http]` config section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut fetcher = Self::with_config(
            config.requests_per_second,
            config.max_retries,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        fetcher.user_agent = config.user_agent.clone();
        Ok(fetcher)
    }

    /// Override the backoff base delay (tests use a few milliseconds)
    #[must_use]
    pub fn with_base_delay(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Build `base?key=value&...` with proper percent-encoding
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if `base` is not an absolute URL
    pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
        Url::parse_with_params(base, params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))
    }

    /// GET a URL and decode its JSON body into `T`
    ///
    /// Waits for the rate limiter, then retries transient failures with
    /// exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Json` for a body that does not match `T`,
    /// `FetchError::ServerError` for non-retryable statuses and
    /// `FetchError::MaxRetriesExceeded` once retries are exhausted
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// GET a URL and return its body as text
    ///
    /// # Errors
    ///
    /// See [`ApiFetcher::get_json`]
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;
        self.fetch_with_retry(url).await
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                tracing::debug!(%url, attempt, delay_ms = delay, "Retrying request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            tracing::trace!(%url, "GET");

            let error = match self
                .client
                .get(url.clone())
                .headers(self.build_headers())
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text().await?);
                }
                Ok(response) => FetchError::ServerError(response.status().as_u16()),
                Err(e) if e.is_timeout() => FetchError::Timeout,
                Err(e) => FetchError::Http(e),
            };

            if !error.is_transient() {
                return Err(error);
            }
            last_error = Some(error);
        }

        Err(FetchError::MaxRetriesExceeded(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    /// Delay before retry `attempt` (1-based), doubling from the base delay
    fn backoff_delay(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("nb-NO,nb;q=0.9,no;q=0.8,en;q=0.7"),
        );

        headers
    }
}

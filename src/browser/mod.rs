//! Headless browser sessions
//!
//! The property detail page renders its details panel client-side, so it is
//! read through a WebDriver session rather than plain HTTP. One session is
//! opened per run and passed explicitly to every scrape.
//!
//! [`PageSession`] is the seam the scraper depends on. [`WebDriverSession`]
//! implements it with fantoccini; tests plug in an in-memory page.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{error::CmdError, wd::Capabilities, Client, ClientBuilder, Locator};
use serde_json::json;
use thiserror::Error;

use crate::config::BrowserConfig;

/// Errors raised by a browser session
#[derive(Error, Debug)]
pub enum BrowserError {
    /// No session could be created at the WebDriver endpoint
    #[error("Failed to start WebDriver session at {url}: {message}")]
    Connect { url: String, message: String },

    /// Navigation command failed
    #[error("Navigation to {url} failed: {message}")]
    Navigate { url: String, message: String },

    /// Element did not appear before the wait bound
    #[error("Element '{selector}' did not appear within {timeout_ms} ms")]
    Timeout { selector: String, timeout_ms: u128 },

    /// Any other WebDriver command failure
    #[error("WebDriver command failed: {0}")]
    Command(String),
}

/// A single, stateful browser tab
///
/// Sessions are not shareable across tasks; every method takes `&mut self`.
#[async_trait]
pub trait PageSession: Send {
    /// Start loading `url`; returns without waiting for the page to settle
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Wait up to `timeout` for an element matching `css` and return its outer HTML
    async fn wait_for_html(&mut self, css: &str, timeout: Duration)
        -> Result<String, BrowserError>;

    /// End the session; further calls are errors
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// fantoccini-backed session against chromedriver, geckodriver or Selenium
pub struct WebDriverSession {
    client: Option<Client>,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Open a session with the configured page load strategy
    ///
    /// # Errors
    ///
    /// Returns `BrowserError::Connect` if the WebDriver endpoint refuses
    pub async fn connect(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let client = ClientBuilder::native()
            .capabilities(Self::capabilities(config))
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Connect {
                url: config.webdriver_url.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(
            webdriver = %config.webdriver_url,
            headless = config.headless,
            strategy = %config.page_load_strategy,
            "Browser session started"
        );

        Ok(Self {
            client: Some(client),
            poll_interval: Duration::from_millis(100),
        })
    }

    fn capabilities(config: &BrowserConfig) -> Capabilities {
        let (chrome_args, firefox_args) = if config.headless {
            (
                vec!["--headless=new", "--disable-gpu", "--no-sandbox"],
                vec!["-headless"],
            )
        } else {
            (vec![], vec![])
        };

        let mut caps = Capabilities::new();
        caps.insert(
            "pageLoadStrategy".into(),
            json!(config.page_load_strategy),
        );
        caps.insert("goog:chromeOptions".into(), json!({ "args": chrome_args }));
        caps.insert("moz:firefoxOptions".into(), json!({ "args": firefox_args }));
        caps
    }

    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::Command("session already closed".into()))
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        tracing::trace!(url, "Navigating");
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigate {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_for_html(
        &mut self,
        css: &str,
        timeout: Duration,
    ) -> Result<String, BrowserError> {
        let poll = self.poll_interval;
        let element = self
            .client()?
            .wait()
            .at_most(timeout)
            .every(poll)
            .for_element(Locator::Css(css))
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => BrowserError::Timeout {
                    selector: css.to_string(),
                    timeout_ms: timeout.as_millis(),
                },
                other => BrowserError::Command(other.to_string()),
            })?;

        element
            .html(false)
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.client.take() {
            Some(client) => {
                client
                    .close()
                    .await
                    .map_err(|e| BrowserError::Command(e.to_string()))?;
                tracing::info!("Browser session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

//! Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use matrikkel::browser::{BrowserError, PageSession};

/// Browser stand-in serving fixed panel HTML per detail page URL
#[derive(Default)]
pub struct FakeSession {
    pages: HashMap<String, String>,
    current: Option<String>,
    pub visited: Vec<String>,
    pub closed: bool,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Command("session already closed".into()));
        }
        self.visited.push(url.to_string());
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_html(&mut self, css: &str, timeout: Duration) -> Result<String, BrowserError> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .ok_or_else(|| BrowserError::Timeout {
                selector: css.to_string(),
                timeout_ms: timeout.as_millis(),
            })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}

/// Details panel with the coordinate row first and the area row second
pub fn details_panel(coordinates: &str, area: &str) -> String {
    format!(
        r#"<div id="eiendomDetails">
  <table class="eiendom-table-column">
    <tbody>
      <tr><td>{coordinates}</td><td>Koordinater</td></tr>
      <tr><td>{area}</td><td>Beregnet areal</td></tr>
    </tbody>
  </table>
</div>"#
    )
}

/// Details panel headed by a parcel title such as `1130-12/345`
pub fn titled_details_panel(title: &str, coordinates: &str, area: &str) -> String {
    details_panel(coordinates, area).replacen(
        "<div id=\"eiendomDetails\">",
        &format!("<div id=\"eiendomDetails\">\n  <h2 class=\"eiendom-title\">{title}</h2>"),
        1,
    )
}

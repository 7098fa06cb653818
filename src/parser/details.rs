//! Property detail page scraping
//!
//! The details panel holds a table whose first row is the projected position,
//! two coordinates followed by `(<epsg>)`, and whose second row starts with the
//! parcel area. The page is loaded without waiting for full readiness, so the
//! scraper waits for the panel itself and re-reads it until it shows the
//! requested parcel with both rows, or the wait bound runs out.
//!
//! The page prints northing before easting (the Norwegian N/Ø order). A UTM
//! easting always lies within 1 000 km of the zone origin while northings in
//! Norway are far beyond that, so the axes are assigned by magnitude and the
//! printed order only decides when both values are small.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use tokio::time::Instant;

use crate::browser::{BrowserError, PageSession};
use crate::crawler::url::detail_page_url;
use crate::models::{CadastralId, ParcelDetails, RawCoordinates};
use crate::parser::number::parse_localized_number;
use crate::parser::selectors::{CELL, DETAILS_PANEL, PANEL_TITLE, TABLE_ROWS};
use crate::utils::error::ScrapeError;

lazy_static! {
    static ref COORDINATE_CELL: Regex =
        Regex::new(r"^(\S+)\s+(\S+)\s+\(\s*(?:EPSG:)?(\d{4,5})\s*\)$").expect("Invalid regex");
    static ref DIGITS: Regex = Regex::new(r"\d+").expect("Invalid regex");
}

/// Upper bound on a projected easting, in meters
const MAX_EASTING_M: f64 = 1_000_000.0;

const COORDINATE_ROW: usize = 0;
const AREA_ROW: usize = 1;

/// Navigates a browser session to detail pages and extracts parcel values
#[derive(Debug, Clone)]
pub struct DetailScraper {
    detail_base: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl DetailScraper {
    #[must_use]
    pub fn new(detail_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            detail_base: detail_base.into(),
            timeout,
            poll_interval: Duration::from_millis(250),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Detail page URL for `id`
    #[must_use]
    pub fn url_for(&self, id: &CadastralId) -> String {
        detail_page_url(&self.detail_base, id)
    }

    /// Load the detail page for `id` and read area and raw coordinates
    ///
    /// # Errors
    ///
    /// `ScrapeError::PanelTimeout` when the panel never renders fully,
    /// `ScrapeError::Browser` on session failures and the parse variants when
    /// a cell is not in the expected format
    pub async fn scrape<S>(
        &self,
        id: &CadastralId,
        session: &mut S,
    ) -> Result<ParcelDetails, ScrapeError>
    where
        S: PageSession + ?Sized,
    {
        let url = self.url_for(id);
        session.navigate(&url).await.map_err(to_scrape_error)?;

        let deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let html = session
                .wait_for_html(DETAILS_PANEL, remaining)
                .await
                .map_err(to_scrape_error)?;

            let extracted = if panel_shows(&html, id) {
                extract_details(&html)
            } else {
                Err(ScrapeError::StalePanel(panel_title(&html).unwrap_or_default()))
            };

            match extracted {
                Err(ScrapeError::MissingRow(_) | ScrapeError::StalePanel(_))
                    if Instant::now() + self.poll_interval < deadline =>
                {
                    tracing::trace!(%id, "Details panel not ready, polling");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e @ (ScrapeError::MissingRow(_) | ScrapeError::StalePanel(_))) => {
                    tracing::debug!(%id, error = %e, "Details panel not ready at deadline");
                    return Err(ScrapeError::PanelTimeout(self.timeout.as_millis()));
                }
                other => return other,
            }
        }
    }
}

/// Heading text of the panel, if it has one
#[must_use]
pub fn panel_title(html: &str) -> Option<String> {
    let document = Html::parse_fragment(html);
    let title = document
        .select(&PANEL_TITLE)
        .next()?
        .text()
        .collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Whether the panel belongs to `id`
///
/// Compares the numbers in the heading with the identifier parts; trailing
/// zero leasehold and section numbers may be left out of the heading. A
/// panel without a heading cannot be checked and is accepted.
#[must_use]
pub fn panel_shows(html: &str, id: &CadastralId) -> bool {
    let Some(title) = panel_title(html) else {
        return true;
    };

    let shown: Vec<u64> = DIGITS
        .find_iter(&title)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let expected: Option<Vec<u64>> = id.parts().iter().map(|p| p.trim().parse().ok()).collect();

    match expected {
        Some(expected) => trim_zero_suffix(&shown) == trim_zero_suffix(&expected),
        None => false,
    }
}

fn trim_zero_suffix(parts: &[u64]) -> &[u64] {
    let mut end = parts.len();
    while end > 3 && parts[end - 1] == 0 {
        end -= 1;
    }
    &parts[..end]
}

fn to_scrape_error(err: BrowserError) -> ScrapeError {
    match err {
        BrowserError::Timeout { timeout_ms, .. } => ScrapeError::PanelTimeout(timeout_ms),
        other => ScrapeError::Browser(other.to_string()),
    }
}

/// Extract area and coordinates from the panel HTML
///
/// # Errors
///
/// `ScrapeError::MissingRow` when a table row or its first cell is absent
pub fn extract_details(html: &str) -> Result<ParcelDetails, ScrapeError> {
    let document = Html::parse_fragment(html);
    let rows: Vec<ElementRef> = document.select(&TABLE_ROWS).collect();

    let coordinates = parse_coordinate_cell(&first_cell_text(&rows, COORDINATE_ROW)?)?;
    let area_m2 = parse_area_cell(&first_cell_text(&rows, AREA_ROW)?)?;

    Ok(ParcelDetails {
        area_m2,
        coordinates,
    })
}

fn first_cell_text(rows: &[ElementRef], index: usize) -> Result<String, ScrapeError> {
    rows.get(index)
        .and_then(|row| row.select(&CELL).next())
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .ok_or(ScrapeError::MissingRow(index))
}

/// Parse `"<a> <b> (<epsg>)"` into easting and northing
///
/// # Errors
///
/// `ScrapeError::BadCoordinates` when the cell has another shape
pub fn parse_coordinate_cell(text: &str) -> Result<RawCoordinates, ScrapeError> {
    let bad = || ScrapeError::BadCoordinates(text.to_string());

    let caps = COORDINATE_CELL.captures(text.trim()).ok_or_else(bad)?;
    let first = parse_localized_number(&caps[1]).ok_or_else(bad)?;
    let second = parse_localized_number(&caps[2]).ok_or_else(bad)?;
    let epsg = caps[3].parse::<u32>().map_err(|_| bad())?;
    let (easting, northing) = assign_axes(first, second);

    Ok(RawCoordinates {
        easting,
        northing,
        epsg,
    })
}

/// `(easting, northing)` from two printed values
///
/// The value that can be an easting is the easting; when both can, the page
/// order (northing first) applies.
fn assign_axes(first: f64, second: f64) -> (f64, f64) {
    let fits = |v: f64| v.abs() < MAX_EASTING_M;
    match (fits(first), fits(second)) {
        (true, false) => (first, second),
        _ => (second, first),
    }
}

/// Parse the area cell into square meters
///
/// # Errors
///
/// `ScrapeError::BadArea` when the cell holds no number or a negative one
pub fn parse_area_cell(text: &str) -> Result<f64, ScrapeError> {
    parse_localized_number(text)
        .filter(|area| *area >= 0.0)
        .ok_or_else(|| ScrapeError::BadArea(text.to_string()))
}

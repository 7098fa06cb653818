//! Error types for the harvesting stages
//!
//! Each stage of the pipeline owns one error enum. The unified
//! [`crate::error::Error`] wraps them at module boundaries.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the postal-code reference table
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// Reference file does not exist
    #[error("Reference table not found: {}", .0.display())]
    Missing(PathBuf),

    /// File could not be read
    #[error("Failed to read reference table {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Spreadsheet could not be opened or has no usable sheet
    #[error("Failed to open workbook {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },

    /// Delimited text could not be parsed
    #[error("Malformed reference table {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row
    #[error("Reference table is missing column '{0}'")]
    MissingColumn(&'static str),

    /// File extension is not a supported table format
    #[error("Unsupported reference table format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Table has no rows at all
    #[error("Reference table is empty")]
    Empty,
}

/// Errors that can occur while talking to the JSON APIs
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded (last: {0})")]
    MaxRetriesExceeded(String),

    /// Response body was not the expected JSON
    #[error("Malformed JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Transient failures worth retrying
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::MaxRetriesExceeded(_) => true,
            Self::ServerError(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Json { .. } | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors raised while extracting values from the property detail page
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Details panel never appeared within the wait bound
    #[error("Details panel did not render within {0} ms")]
    PanelTimeout(u128),

    /// Browser failed to navigate or query the page
    #[error("Browser error: {0}")]
    Browser(String),

    /// Panel rendered but a table row is absent
    #[error("Details table row {0} not found")]
    MissingRow(usize),

    /// Panel still shows another parcel
    #[error("Details panel shows parcel '{0}'")]
    StalePanel(String),

    /// Coordinate cell does not look like `<E> <N> (<epsg>)`
    #[error("Unrecognised coordinate cell: '{0}'")]
    BadCoordinates(String),

    /// Area cell is not a localized number
    #[error("Unrecognised area value: '{0}'")]
    BadArea(String),
}

/// Errors raised by the coordinate transformer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Source or target code is not a supported reference system
    #[error("Unsupported reprojection EPSG:{source_epsg} -> EPSG:{target_epsg}")]
    Unsupported { source_epsg: u32, target_epsg: u32 },

    /// Input was NaN or infinite
    #[error("Non-finite input coordinate ({easting}, {northing})")]
    NonFinite { easting: f64, northing: f64 },

    /// Result fell outside the geographic domain
    #[error("Reprojected point out of range: lat={latitude}, lon={longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
}

//! Unified error handling for the matrikkel crate
//!
//! Stage-specific errors live in [`crate::utils::error`]. This module folds
//! them into one [`Error`] enum that the pipeline can classify without knowing
//! which stage produced it. Browser failures reach it as [`ScrapeError`].
//! Configuration problems are reported through `anyhow` before a run starts.
//!
//! # Architecture
//!
//! - [`HarvestErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all stage errors
//!
//! Only [`ErrorCategory::DataLoad`] and [`ErrorCategory::Storage`] abort a
//! whole run. Everything else costs one
//! address (or one postal area) and the batch carries on.

use std::io;
use thiserror::Error;

use crate::models::CadastralId;
pub use crate::utils::error::{DataLoadError, FetchError, ScrapeError, TransformError};

/// Common trait for matrikkel error types
pub trait HarvestErrorTrait: std::error::Error {
    /// Check if this error only affects the current record
    fn is_recoverable(&self) -> bool;

    /// Check if this error must abort the whole run
    fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Reference table unreadable
    DataLoad,
    /// Address or cadastral API network/parse failure
    Upstream,
    /// Cadastral search returned no (or no acceptable) match
    NotFound,
    /// Detail page did not render the expected content
    Scrape,
    /// Reprojection failed or produced invalid output
    Transform,
    /// Output file could not be written
    Storage,
}

impl ErrorCategory {
    /// Short label used in logs and failure reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataLoad => "data-load",
            Self::Upstream => "upstream",
            Self::NotFound => "not-found",
            Self::Scrape => "scrape",
            Self::Transform => "transform",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the matrikkel crate
#[derive(Error, Debug)]
pub enum Error {
    /// Reference table errors
    #[error("Data load error: {0}")]
    DataLoad(#[from] DataLoadError),

    /// Address/cadastral API errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] FetchError),

    /// Cadastral search returned an empty result
    #[error("No cadastral match for '{query}'")]
    NotFound { query: String },

    /// Cadastral search returned several matches and the policy rejects them
    #[error("Ambiguous cadastral match for '{query}' ({} candidates)", .candidates.len())]
    Ambiguous {
        query: String,
        candidates: Vec<CadastralId>,
    },

    /// Detail page scraping errors
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// Reprojection errors
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV output errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HarvestErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::DataLoad | ErrorCategory::Storage)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::DataLoad(_) => ErrorCategory::DataLoad,
            Self::Upstream(_) => ErrorCategory::Upstream,
            Self::NotFound { .. } | Self::Ambiguous { .. } => ErrorCategory::NotFound,
            Self::Scrape(_) => ErrorCategory::Scrape,
            Self::Transform(_) => ErrorCategory::Transform,
            Self::Io(_) | Self::Csv(_) => ErrorCategory::Storage,
        }
    }
}

impl Error {
    /// Create a not-found error for a search query
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

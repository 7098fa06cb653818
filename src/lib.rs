//! matrikkel - Norwegian property data harvester
//!
//! Discovers every street address in a set of postal areas, resolves each one
//! to its cadastral identifier (matrikkelnummer), reads parcel area and
//! position from the property detail page through a headless browser, and
//! writes one CSV row per parcel with WGS84 coordinates.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and settings
//! - [`postal`] - Postal-code reference table loading and filtering
//! - [`crawler`] - Address and cadastral APIs, plus the batch pipeline
//! - [`browser`] - WebDriver session behind the [`browser::PageSession`] trait
//! - [`parser`] - Detail page extraction and localized number parsing
//! - [`transform`] - UTM to latitude/longitude conversion
//! - [`storage`] - CSV output and deduplication by cadastral identifier
//! - [`models`] - Core data structures and types
//! - [`error`] - Unified error type and classification
//!
//! # Example
//!
//! ```no_run
//! use matrikkel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let areas = resolve_postal_areas(
//!         &config.harvest.postal_table,
//!         &config.harvest.municipalities,
//!         &config.harvest.category,
//!     )?;
//!
//!     let fetcher = ApiFetcher::from_config(&config.http)?;
//!     let pipeline = HarvestPipeline::new(PipelineConfig::from_config(&config), fetcher);
//!     let mut session = WebDriverSession::connect(&config.browser).await?;
//!
//!     let report = pipeline.harvest(&areas, &mut session, |_| {}).await?;
//!     println!("{} parcels, {} failures", report.records.len(), report.failures.len());
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod postal;
pub mod storage;
pub mod transform;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::browser::{PageSession, WebDriverSession};
    pub use crate::config::{AmbiguityPolicy, Config};
    pub use crate::crawler::fetcher::ApiFetcher;
    pub use crate::crawler::pipeline::{HarvestPipeline, HarvestReport, PipelineConfig};
    pub use crate::error::{Error, ErrorCategory, HarvestErrorTrait, Result};
    pub use crate::models::{Address, CadastralId, ParcelRecord, PostalArea};
    pub use crate::postal::resolve_postal_areas;
    pub use crate::transform::CoordinateTransformer;
}

// Direct re-exports for convenience
pub use models::{Address, CadastralId, ParcelRecord, PostalArea};

//! Sequential harvest pipeline
//!
//! Every address walks the same state machine, one at a time, through a single
//! browser session:
//!
//! ```text
//! Pending ──resolve──▶ Resolved ──scrape──▶ Scraped ──transform──▶ Transformed ──▶ Recorded
//!    │                    │                    │
//!    └────────────────────┴────────────────────┴──────────────────▶ Failed
//! ```
//!
//! A failure costs that address only. Address discovery fails per postal area.
//! After the loop the full table is written for auditing and the table
//! deduplicated by cadastral identifier is returned.
//!
//! # Example
//!
//! ```no_run
//! use matrikkel::browser::WebDriverSession;
//! use matrikkel::config::Config;
//! use matrikkel::crawler::fetcher::ApiFetcher;
//! use matrikkel::crawler::pipeline::{HarvestPipeline, PipelineConfig};
//! use matrikkel::models::PostalArea;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let fetcher = ApiFetcher::from_config(&config.http)?;
//! let pipeline = HarvestPipeline::new(PipelineConfig::from_config(&config), fetcher);
//!
//! let mut session = WebDriverSession::connect(&config.browser).await?;
//! let areas = vec![PostalArea::new("4100", "JØRPELAND")];
//! let report = pipeline.harvest(&areas, &mut session, |_| {}).await?;
//!
//! println!("{} parcels", report.records.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;

use crate::browser::PageSession;
use crate::config::{AmbiguityPolicy, Config};
use crate::crawler::address::AddressEnumerator;
use crate::crawler::cadastral::CadastralResolver;
use crate::crawler::fetcher::ApiFetcher;
use crate::crawler::url::map_viewer_url;
use crate::error::{Error, ErrorCategory, HarvestErrorTrait, Result};
use crate::models::{Address, AddressState, HarvestStats, ParcelRecord, PostalArea};
use crate::parser::DetailScraper;
use crate::storage;
use crate::transform::CoordinateTransformer;

// ============================================================================
// Configuration
// ============================================================================

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Grouped-address search endpoint
    pub address_api_url: String,

    /// Cadastral search endpoint
    pub cadastral_api_url: String,

    /// Detail page base URL
    pub detail_base_url: String,

    /// Map viewer base URL
    pub map_viewer_url: String,

    /// Addresses requested per page
    pub page_size: u32,

    /// Upper bound on pages per postal area
    pub max_pages: u32,

    /// Process only the first N discovered addresses
    pub limit: Option<usize>,

    /// Full table, one row per recorded address
    pub output: PathBuf,

    /// Optional deduplicated table
    pub dedup_output: Option<PathBuf>,

    /// Log failures at warn level with full detail
    pub verbose: bool,

    /// Handling of ambiguous cadastral matches
    pub ambiguity: AmbiguityPolicy,

    /// Geographic system for latitude/longitude
    pub target_epsg: u32,

    /// Upper bound on waiting for the details panel
    pub wait_timeout: Duration,
}

impl PipelineConfig {
    /// Pipeline settings from the application configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            address_api_url: config.sources.address_api_url.clone(),
            cadastral_api_url: config.sources.cadastral_api_url.clone(),
            detail_base_url: config.sources.detail_base_url.clone(),
            map_viewer_url: config.sources.map_viewer_url.clone(),
            page_size: config.harvest.page_size,
            max_pages: config.harvest.max_pages,
            limit: config.harvest.limit,
            output: config.harvest.output.clone(),
            dedup_output: config.harvest.dedup_output.clone(),
            verbose: config.harvest.verbose,
            ambiguity: config.harvest.ambiguity,
            target_epsg: config.harvest.target_epsg,
            wait_timeout: config.wait_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Step at which an address dropped out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolve,
    Scrape,
    Transform,
}

impl Stage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Scrape => "scrape",
            Self::Transform => "transform",
        }
    }

    /// Last state the address reached before failing
    #[must_use]
    pub fn last_state(&self) -> AddressState {
        match self {
            Self::Resolve => AddressState::Pending,
            Self::Scrape => AddressState::Resolved,
            Self::Transform => AddressState::Scraped,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One address that ended in [`AddressState::Failed`]
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAddress {
    pub address: Address,
    pub stage: Stage,
    /// Furthest state reached before the failure
    pub last_state: AddressState,
    pub category: ErrorCategory,
    pub message: String,
}

/// One postal area whose address list could not be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct FailedArea {
    pub area: PostalArea,
    pub message: String,
}

/// Addresses found across postal areas
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Per-area lists concatenated in area order; no cross-area dedup
    pub addresses: Vec<Address>,
    pub failed_areas: Vec<FailedArea>,
}

/// Progress notification after each address reaches a terminal state
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based position
    pub index: usize,
    pub total: usize,
    pub address: &'a Address,
    pub state: AddressState,
}

/// Result of a harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Deduplicated rows, first occurrence per parcel
    pub records: Vec<ParcelRecord>,

    /// Rows in the full table before deduplication
    pub total_rows: usize,

    pub failures: Vec<FailedAddress>,

    pub failed_areas: Vec<FailedArea>,

    /// Addresses dropped because their parcel was already recorded
    pub duplicates: Vec<String>,

    /// Run stopped early on request
    pub cancelled: bool,

    pub stats: HarvestStats,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Sequential orchestrator for discovery, resolution, scraping and reprojection
pub struct HarvestPipeline {
    config: PipelineConfig,
    fetcher: ApiFetcher,
    scraper: DetailScraper,
    transformer: CoordinateTransformer,
    cancel: Option<watch::Receiver<bool>>,
}

impl HarvestPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, fetcher: ApiFetcher) -> Self {
        let scraper = DetailScraper::new(config.detail_base_url.clone(), config.wait_timeout);
        Self {
            config,
            fetcher,
            scraper,
            transformer: CoordinateTransformer::new(),
            cancel: None,
        }
    }

    /// Stop between addresses once `cancel` turns `true`
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Replace the detail scraper (tests shorten its polling)
    #[must_use]
    pub fn with_scraper(mut self, scraper: DetailScraper) -> Self {
        self.scraper = scraper;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Discover, process and persist in one call
    ///
    /// # Errors
    ///
    /// Only fatal errors (output cannot be written) are returned
    pub async fn harvest<S, F>(
        &self,
        areas: &[PostalArea],
        session: &mut S,
        on_progress: F,
    ) -> Result<HarvestReport>
    where
        S: PageSession + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let discovery = self.discover(areas).await;
        let mut report = self.run(&discovery.addresses, session, on_progress).await?;

        report.stats.failed_areas = discovery.failed_areas.len() as u32;
        report.failed_areas = discovery.failed_areas;
        Ok(report)
    }

    /// Enumerate addresses for every area; a failing area is recorded and skipped
    pub async fn discover(&self, areas: &[PostalArea]) -> Discovery {
        let enumerator = AddressEnumerator::new(&self.fetcher, self.config.address_api_url.as_str())
            .with_paging(self.config.page_size, self.config.max_pages);
        let mut discovery = Discovery::default();

        for area in areas {
            if self.is_cancelled() {
                tracing::info!("Cancelled during address discovery");
                break;
            }

            match enumerator.enumerate(area).await {
                Ok(addresses) => discovery.addresses.extend(addresses),
                Err(e) => {
                    if self.config.verbose {
                        tracing::warn!(area = %area, error = %e, "Address lookup failed, skipping postal area");
                    } else {
                        tracing::debug!(area = %area, error = %e, "Address lookup failed");
                    }
                    discovery.failed_areas.push(FailedArea {
                        area: area.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            areas = areas.len(),
            failed_areas = discovery.failed_areas.len(),
            addresses = discovery.addresses.len(),
            "Address discovery finished"
        );

        discovery
    }

    /// Process `addresses` through one browser session, then persist
    ///
    /// The session is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Only fatal errors (output cannot be written) are returned
    pub async fn run<S, F>(
        &self,
        addresses: &[Address],
        session: &mut S,
        mut on_progress: F,
    ) -> Result<HarvestReport>
    where
        S: PageSession + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let batch = self.process_all(addresses, session, &mut on_progress).await;

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }

        self.persist(batch?)
    }

    async fn process_all<S, F>(
        &self,
        addresses: &[Address],
        session: &mut S,
        on_progress: &mut F,
    ) -> Result<Batch>
    where
        S: PageSession + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let selected = match self.config.limit {
            Some(limit) => &addresses[..limit.min(addresses.len())],
            None => addresses,
        };
        let total = selected.len();
        let mut batch = Batch {
            rows: Vec::with_capacity(total),
            failures: Vec::new(),
            cancelled: false,
            stats: HarvestStats::new(total as u32),
        };

        tracing::info!(total, "Processing addresses");

        for (i, address) in selected.iter().enumerate() {
            if self.is_cancelled() {
                tracing::info!(processed = i, total, "Cancelled, stopping before next address");
                batch.cancelled = true;
                break;
            }

            let state = match self.process_address(address, session).await {
                Ok(record) => {
                    batch.rows.push(record);
                    batch.stats.recorded += 1;
                    AddressState::Recorded
                }
                Err((_, e)) if e.is_fatal() => return Err(e),
                Err((stage, e)) => {
                    self.report_failure(address, stage, &e);
                    batch.failures.push(FailedAddress {
                        address: address.clone(),
                        stage,
                        last_state: stage.last_state(),
                        category: e.category(),
                        message: e.to_string(),
                    });
                    batch.stats.failed += 1;
                    AddressState::Failed
                }
            };

            on_progress(Progress {
                index: i + 1,
                total,
                address,
                state,
            });
        }

        Ok(batch)
    }

    /// Walk one address through resolve, scrape and transform
    ///
    /// # Errors
    ///
    /// The failing stage and its error; the address ends in `Failed`
    pub async fn process_address<S>(
        &self,
        address: &Address,
        session: &mut S,
    ) -> std::result::Result<ParcelRecord, (Stage, Error)>
    where
        S: PageSession + ?Sized,
    {
        let query = address.search_query();
        let resolver = CadastralResolver::new(&self.fetcher, self.config.cadastral_api_url.as_str());

        let id = resolver
            .resolve(address)
            .await
            .and_then(|resolution| resolution.apply(self.config.ambiguity, &query))
            .map_err(|e| (Stage::Resolve, e))?;
        if !id.is_complete() {
            return Err((
                Stage::Resolve,
                Error::not_found(format!("{query} (incomplete identifier {id})")),
            ));
        }
        tracing::trace!(address = %address, cadastral_id = %id, state = %AddressState::Resolved);

        let details = self
            .scraper
            .scrape(&id, session)
            .await
            .map_err(|e| (Stage::Scrape, Error::from(e)))?;
        tracing::trace!(address = %address, area_m2 = details.area_m2, state = %AddressState::Scraped);

        let raw = details.coordinates;
        let (latitude, longitude) = self
            .transformer
            .transform(raw.easting, raw.northing, raw.epsg, self.config.target_epsg)
            .map_err(|e| (Stage::Transform, Error::from(e)))?;
        tracing::trace!(address = %address, latitude, longitude, state = %AddressState::Transformed);

        Ok(ParcelRecord {
            address: address.to_string(),
            kartverket_url: self.scraper.url_for(&id),
            norgeskart_url: map_viewer_url(&self.config.map_viewer_url, &raw),
            cadastral_id: id,
            area_m2: details.area_m2,
            latitude,
            longitude,
        })
    }

    fn report_failure(&self, address: &Address, stage: Stage, error: &Error) {
        if self.config.verbose {
            tracing::warn!(
                address = %address,
                stage = %stage,
                last_state = %stage.last_state(),
                category = %error.category(),
                error = %error,
                "Address failed"
            );
        } else {
            tracing::debug!(address = %address, stage = %stage, error = %error, "Address failed");
        }
    }

    fn persist(&self, mut batch: Batch) -> Result<HarvestReport> {
        storage::write_records(&self.config.output, &batch.rows)?;

        let outcome = storage::dedup_by_cadastral_id(&batch.rows);
        if let Some(path) = &self.config.dedup_output {
            storage::write_records(path, &outcome.records)?;
        }

        batch.stats.duplicates = outcome.duplicate_count() as u32;
        batch.stats.finish();

        tracing::info!(
            recorded = batch.stats.recorded,
            failed = batch.stats.failed,
            unique = outcome.records.len(),
            duplicates = batch.stats.duplicates,
            dedup_ratio = outcome.dedup_ratio(),
            cancelled = batch.cancelled,
            "Harvest finished"
        );

        Ok(HarvestReport {
            total_rows: batch.rows.len(),
            records: outcome.records,
            duplicates: outcome.dropped,
            failures: batch.failures,
            failed_areas: Vec::new(),
            cancelled: batch.cancelled,
            stats: batch.stats,
        })
    }
}

/// Rows and failures collected by the address loop
struct Batch {
    rows: Vec<ParcelRecord>,
    failures: Vec<FailedAddress>,
    cancelled: bool,
    stats: HarvestStats,
}

// ============================================================================
// Tests
// ============================================================================

// Core data structures for the matrikkel harvester

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Postal area used to seed address discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostalArea {
    pub postal_code: String,  // e.g. "4100"
    pub postal_place: String, // e.g. "JØRPELAND"
}

impl PostalArea {
    pub fn new(postal_code: impl Into<String>, postal_place: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            postal_place: postal_place.into(),
        }
    }

    /// Free-text query understood by the address API: `"<code> <place>"`
    pub fn query(&self) -> String {
        format!("{} {}", self.postal_code, self.postal_place)
    }
}

impl fmt::Display for PostalArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.postal_code, self.postal_place)
    }
}

/// Street address inside one postal area
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub street_name: String,
    pub street_number: String, // may carry a letter, e.g. "12B"
    pub postal_code: String,
    pub postal_place: String,
}

impl Address {
    pub fn new(street_name: &str, street_number: &str, area: &PostalArea) -> Self {
        Self {
            street_name: street_name.trim().to_string(),
            street_number: street_number.trim().to_string(),
            postal_code: area.postal_code.clone(),
            postal_place: area.postal_place.clone(),
        }
    }

    /// Search string for the cadastral API: `"<street> <number>, <code> <place>"`
    pub fn search_query(&self) -> String {
        format!(
            "{} {}, {} {}",
            self.street_name, self.street_number, self.postal_code, self.postal_place
        )
    }
}

/// Rendered as the `Adresse` output column
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.street_name, self.street_number, self.postal_code, self.postal_place
        )
    }
}

/// Official Norwegian property identifier (matrikkelnummer)
///
/// Natural primary key of a parcel. Several street addresses can share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CadastralId {
    pub municipality_no: String, // kommunenummer
    pub parcel_no: String,       // gårdsnummer
    pub usage_no: String,        // bruksnummer
    pub leasehold_no: String,    // festenummer
    pub section_no: String,      // seksjonsnummer
}

impl CadastralId {
    pub fn new(
        municipality_no: impl Into<String>,
        parcel_no: impl Into<String>,
        usage_no: impl Into<String>,
        leasehold_no: impl Into<String>,
        section_no: impl Into<String>,
    ) -> Self {
        Self {
            municipality_no: municipality_no.into(),
            parcel_no: parcel_no.into(),
            usage_no: usage_no.into(),
            leasehold_no: leasehold_no.into(),
            section_no: section_no.into(),
        }
    }

    /// The five fields in path order
    pub fn parts(&self) -> [&str; 5] {
        [
            self.municipality_no.as_str(),
            self.parcel_no.as_str(),
            self.usage_no.as_str(),
            self.leasehold_no.as_str(),
            self.section_no.as_str(),
        ]
    }

    /// `municipality/parcel/usage/leasehold/section`
    pub fn path(&self) -> String {
        self.parts().join("/")
    }

    /// All fields non-empty
    pub fn is_complete(&self) -> bool {
        self.parts().iter().all(|p| !p.trim().is_empty())
    }
}

impl fmt::Display for CadastralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Projected coordinates as printed on the detail page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinates {
    pub easting: f64,
    pub northing: f64,
    pub epsg: u32,
}

/// Values scraped from one property detail page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelDetails {
    pub area_m2: f64,
    pub coordinates: RawCoordinates,
}

/// One row of the output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub address: String,
    pub cadastral_id: CadastralId,
    pub kartverket_url: String,
    pub norgeskart_url: String,
    pub area_m2: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-address processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressState {
    Pending,
    Resolved,
    Scraped,
    Transformed,
    Recorded,
    Failed,
}

impl AddressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Scraped => "scraped",
            Self::Transformed => "transformed",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AddressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harvest statistics
#[derive(Debug, Clone, Serialize)]
pub struct HarvestStats {
    pub total_addresses: u32,
    pub recorded: u32,
    pub failed: u32,
    pub duplicates: u32,
    pub failed_areas: u32,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
}

impl HarvestStats {
    pub fn new(total_addresses: u32) -> Self {
        Self {
            total_addresses,
            recorded: 0,
            failed: 0,
            duplicates: 0,
            failed_areas: 0,
            started_at: Utc::now(),
            duration_secs: 0,
        }
    }

    /// Stamp elapsed time since `started_at`
    pub fn finish(&mut self) {
        self.duration_secs = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
    }

    /// Failure rate as percentage of processed addresses
    pub fn failure_rate(&self) -> f64 {
        let processed = self.recorded + self.failed;
        if processed == 0 {
            0.0
        } else {
            (self.failed as f64 / processed as f64) * 100.0
        }
    }

    /// Addresses processed per minute
    pub fn rate_per_minute(&self) -> f64 {
        if self.duration_secs == 0 {
            0.0
        } else {
            ((self.recorded + self.failed) as f64 / self.duration_secs as f64) * 60.0
        }
    }
}

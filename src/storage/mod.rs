//! Output table persistence
//!
//! Records are written as CSV with a fixed, Norwegian-named header that the
//! map front-end reads. The column order is part of that contract.

pub mod dedup;

pub use dedup::{dedup_by_cadastral_id, DedupOutcome};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CadastralId, ParcelRecord};

/// Output header, in order
pub const COLUMNS: [&str; 11] = [
    "Adresse",
    "Kommunenummer",
    "Gårdsnummer",
    "Bruksnummer",
    "Festenummer",
    "Seksjonsnummer",
    "Kartverket",
    "Norgeskart",
    "Areal",
    "Latitude",
    "Longitude",
];

/// One CSV row; field order matches [`COLUMNS`]
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Adresse")]
    address: String,
    #[serde(rename = "Kommunenummer")]
    municipality_no: String,
    #[serde(rename = "Gårdsnummer")]
    parcel_no: String,
    #[serde(rename = "Bruksnummer")]
    usage_no: String,
    #[serde(rename = "Festenummer")]
    leasehold_no: String,
    #[serde(rename = "Seksjonsnummer")]
    section_no: String,
    #[serde(rename = "Kartverket")]
    kartverket_url: String,
    #[serde(rename = "Norgeskart")]
    norgeskart_url: String,
    #[serde(rename = "Areal")]
    area_m2: f64,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
}

impl From<&ParcelRecord> for CsvRow {
    fn from(record: &ParcelRecord) -> Self {
        let id = &record.cadastral_id;
        Self {
            address: record.address.clone(),
            municipality_no: id.municipality_no.clone(),
            parcel_no: id.parcel_no.clone(),
            usage_no: id.usage_no.clone(),
            leasehold_no: id.leasehold_no.clone(),
            section_no: id.section_no.clone(),
            kartverket_url: record.kartverket_url.clone(),
            norgeskart_url: record.norgeskart_url.clone(),
            area_m2: record.area_m2,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

impl From<CsvRow> for ParcelRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            address: row.address,
            cadastral_id: CadastralId::new(
                row.municipality_no,
                row.parcel_no,
                row.usage_no,
                row.leasehold_no,
                row.section_no,
            ),
            kartverket_url: row.kartverket_url,
            norgeskart_url: row.norgeskart_url,
            area_m2: row.area_m2,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

/// Write `records` to `path`, replacing any existing file
///
/// The header is written even for an empty table. Parent directories are
/// created as needed.
///
/// # Errors
///
/// `Error::Io` or `Error::Csv` when the file cannot be written
pub fn write_records(path: &Path, records: &[ParcelRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "Wrote output table");

    Ok(())
}

/// Read a table previously written by [`write_records`]
///
/// # Errors
///
/// `Error::Io` or `Error::Csv` when the file is missing or malformed
pub fn read_records(path: &Path) -> Result<Vec<ParcelRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| Ok(ParcelRecord::from(row?)))
        .collect()
}

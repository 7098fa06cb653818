//! Postal-area resolution from the postal-code reference table
//!
//! The reference table (Posten/Bring's postnummerregister) lists every postal
//! code with its place, municipality and category. Street-address codes carry
//! category `G`. Loading accepts spreadsheets (via `calamine`) and delimited
//! text (via `csv`); the text export Bring publishes has no header row and is
//! Windows-1252 encoded, both of which are detected here.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;

use crate::models::PostalArea;
use crate::utils::error::DataLoadError;

pub const COL_MUNICIPALITY: &str = "Kommunenavn";
pub const COL_POSTAL_CODE: &str = "Postnummer";
pub const COL_POSTAL_PLACE: &str = "Poststed";
pub const COL_CATEGORY: &str = "Kategori";

/// Category code for postal codes that cover street addresses
pub const STREET_ADDRESS_CATEGORY: &str = "G";

/// Column order of the headerless register export:
/// Postnummer, Poststed, Kommunenummer, Kommunenavn, Kategori
const HEADERLESS_LAYOUT: ColumnIndex = ColumnIndex {
    postal_code: 0,
    postal_place: 1,
    municipality: 3,
    category: 4,
};

/// One row of the reference table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalRow {
    pub postal_code: String,
    pub postal_place: String,
    pub municipality: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    postal_code: usize,
    postal_place: usize,
    municipality: usize,
    category: usize,
}

impl ColumnIndex {
    fn from_header(header: &[String]) -> Result<Self, DataLoadError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(DataLoadError::MissingColumn(name))
        };

        Ok(Self {
            postal_code: find(COL_POSTAL_CODE)?,
            postal_place: find(COL_POSTAL_PLACE)?,
            municipality: find(COL_MUNICIPALITY)?,
            category: find(COL_CATEGORY)?,
        })
    }

    fn row(&self, cells: &[String]) -> Option<PostalRow> {
        let get = |i: usize| cells.get(i).map(|c| c.trim().to_string());
        let row = PostalRow {
            postal_code: normalize_postal_code(&get(self.postal_code)?),
            postal_place: get(self.postal_place)?,
            municipality: get(self.municipality)?,
            category: get(self.category)?,
        };
        (!row.postal_code.is_empty() && !row.postal_place.is_empty()).then_some(row)
    }
}

/// Postal-code reference table held in file order
#[derive(Debug, Clone, Default)]
pub struct PostalTable {
    rows: Vec<PostalRow>,
}

impl PostalTable {
    pub fn from_rows(rows: Vec<PostalRow>) -> Self {
        Self { rows }
    }

    /// Load the table, choosing the reader from the file extension
    ///
    /// # Errors
    ///
    /// Returns `DataLoadError` if the file is missing, unreadable, or lacks
    /// one of the required columns.
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        if !path.exists() {
            return Err(DataLoadError::Missing(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let cells = match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
            "csv" | "tsv" | "txt" => read_delimited(path, &extension)?,
            _ => return Err(DataLoadError::UnsupportedFormat(path.to_path_buf())),
        };

        let table = Self::from_cells(cells)?;
        tracing::info!(
            path = %path.display(),
            rows = table.len(),
            "Loaded postal reference table"
        );
        Ok(table)
    }

    /// Build a table from raw rows; the first row is a header unless it
    /// already starts with a postal code
    fn from_cells(cells: Vec<Vec<String>>) -> Result<Self, DataLoadError> {
        let mut iter = cells.into_iter().filter(|r| r.iter().any(|c| !c.trim().is_empty()));
        let first = iter.next().ok_or(DataLoadError::Empty)?;

        let (index, first_data) = if looks_like_postal_code(first.first().map(String::as_str)) {
            (HEADERLESS_LAYOUT, Some(first))
        } else {
            (ColumnIndex::from_header(&first)?, None)
        };

        let rows = first_data
            .into_iter()
            .chain(iter)
            .filter_map(|r| index.row(&r))
            .collect();

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PostalRow] {
        &self.rows
    }

    /// Rows whose municipality (case-insensitive) is requested and whose
    /// category matches, in table order, each postal area once
    pub fn filter(&self, municipalities: &[String], category: &str) -> Vec<PostalArea> {
        let wanted: HashSet<String> = municipalities
            .iter()
            .map(|m| m.trim().to_lowercase())
            .collect();
        let category = category.trim();

        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| wanted.contains(&r.municipality.to_lowercase()) && r.category == category)
            .map(|r| PostalArea::new(r.postal_code.clone(), r.postal_place.clone()))
            .filter(|area| seen.insert(area.clone()))
            .collect()
    }
}

/// Load the reference table and resolve postal areas in one step
///
/// # Errors
///
/// Returns `DataLoadError` if the table cannot be loaded.
pub fn resolve_postal_areas(
    path: &Path,
    municipalities: &[String],
    category: &str,
) -> Result<Vec<PostalArea>, DataLoadError> {
    let table = PostalTable::load(path)?;
    let areas = table.filter(municipalities, category);

    tracing::info!(
        municipalities = ?municipalities,
        category,
        areas = areas.len(),
        "Resolved postal areas"
    );

    Ok(areas)
}

/// Zero-pad purely numeric codes to four digits ("150" -> "0150")
fn normalize_postal_code(raw: &str) -> String {
    let code = raw.trim();
    if !code.is_empty() && code.len() < 4 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{code:0>4}")
    } else {
        code.to_string()
    }
}

fn looks_like_postal_code(cell: Option<&str>) -> bool {
    cell.map(str::trim)
        .is_some_and(|c| (1..=4).contains(&c.len()) && c.chars().all(|ch| ch.is_ascii_digit()))
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, DataLoadError> {
    let workbook_err = |message: String| DataLoadError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_err("workbook has no worksheet".to_string()))?
        .map_err(|e| workbook_err(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_string).collect())
        .collect())
}

fn cell_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Data::Float(v) => format!("{v}"),
        Data::Int(v) => format!("{v}"),
        Data::Bool(v) => v.to_string(),
        other => other.to_string(),
    }
}

fn read_delimited(path: &Path, extension: &str) -> Result<Vec<Vec<String>>, DataLoadError> {
    let bytes = std::fs::read(path).map_err(|source| DataLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(&bytes);
    let delimiter = sniff_delimiter(&text, extension);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|source| DataLoadError::Csv {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .collect()
}

/// UTF-8 when valid (BOM stripped), otherwise Windows-1252
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            let (cow, _encoding, _had_errors) = WINDOWS_1252.decode(bytes);
            cow.into_owned()
        }
    }
}

fn sniff_delimiter(text: &str, extension: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    let count = |c: char| first_line.matches(c).count();

    if count('\t') > 0 || (extension != "csv" && count(';') == 0 && count(',') == 0) {
        b'\t'
    } else if count(';') >= count(',') {
        b';'
    } else {
        b','
    }
}

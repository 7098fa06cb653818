//! Deduplication of output rows by cadastral identity
//!
//! Several street addresses can sit on one parcel (apartment blocks, corner
//! plots). The parcel is the unit of the output, so the first row seen for a
//! [`CadastralId`] wins and later ones are dropped.

use std::collections::HashSet;

use crate::models::{CadastralId, ParcelRecord};

/// Deduplicated rows plus what was dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Unique rows in first-seen order
    pub records: Vec<ParcelRecord>,

    /// Addresses whose parcel was already present
    pub dropped: Vec<String>,
}

impl DedupOutcome {
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.dropped.len()
    }

    /// Share of input rows that were duplicates, as a percentage
    #[must_use]
    pub fn dedup_ratio(&self) -> f64 {
        let total = self.records.len() + self.dropped.len();
        if total == 0 {
            0.0
        } else {
            (self.dropped.len() as f64 / total as f64) * 100.0
        }
    }
}

/// Keep the first row for every cadastral identifier, preserving order
#[must_use]
pub fn dedup_by_cadastral_id(records: &[ParcelRecord]) -> DedupOutcome {
    let mut seen: HashSet<&CadastralId> = HashSet::with_capacity(records.len());
    let mut outcome = DedupOutcome::default();

    for record in records {
        if seen.insert(&record.cadastral_id) {
            outcome.records.push(record.clone());
        } else {
            tracing::debug!(
                address = %record.address,
                cadastral_id = %record.cadastral_id,
                "Dropping duplicate parcel"
            );
            outcome.dropped.push(record.address.clone());
        }
    }

    outcome
}

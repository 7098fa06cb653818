//! Integration tests module
//!
//! End-to-end tests for the harvest pipeline against mocked address and
//! cadastral APIs and a scripted browser session:
//! - Postal area -> address -> parcel -> CSV
//! - Deduplication and output files
//! - Failure isolation, cancellation and limits

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;

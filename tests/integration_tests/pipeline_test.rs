//! End-to-end pipeline integration tests
//!
//! Tests the complete workflow:
//! 1. Address discovery per postal area (mocked API)
//! 2. Cadastral resolution (mocked API)
//! 3. Detail page scraping (scripted browser session)
//! 4. Reprojection to latitude/longitude
//! 5. CSV output and deduplication

use matrikkel::crawler::pipeline::Stage;
use matrikkel::error::ErrorCategory;
use matrikkel::models::{Address, AddressState, PostalArea};
use matrikkel::storage::{read_records, COLUMNS};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::MockServer;

use super::fixtures::*;
use crate::common::{details_panel, FakeSession};

// ============================================================================
// Complete Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_two_addresses_one_recorded_one_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_addresses(&server, "4120 TAU", address_page("Fjordgata", &["1", "2"])).await;
    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;
    mount_search(&server, "Fjordgata 2, 4120 TAU", json!([])).await;

    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel(COORDINATES_25832, "650,0 m²"),
    );

    let config = pipeline_config(&server, temp_dir.path());
    let output = config.output.clone();
    let pipeline = build_pipeline(config);

    let areas = vec![PostalArea::new("4120", "TAU")];
    let report = pipeline.harvest(&areas, &mut session, |_| {}).await.unwrap();

    assert_eq!(report.total_rows, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.stats.total_addresses, 2);
    assert!(!report.cancelled);

    let failure = &report.failures[0];
    assert_eq!(failure.address.street_number, "2");
    assert_eq!(failure.stage, Stage::Resolve);
    assert_eq!(failure.last_state, AddressState::Pending);
    assert_eq!(failure.category, ErrorCategory::NotFound);

    let record = &report.records[0];
    assert_eq!(record.address, "Fjordgata 1 4120 TAU");
    assert_eq!(record.cadastral_id.path(), "1130/12/345/0/0");
    assert_eq!(record.kartverket_url, detail_url("1130/12/345/0/0"));
    assert!(record.norgeskart_url.contains("lat=6540659.78"));
    assert!(record.norgeskart_url.contains("lon=325806.144"));
    assert_eq!(record.area_m2, 650.0);
    assert!((record.latitude - EXPECTED_LATITUDE).abs() < 1e-5);
    assert!((record.longitude - EXPECTED_LONGITUDE).abs() < 1e-5);

    let written = std::fs::read_to_string(&output).unwrap();
    let header = written.lines().next().unwrap();
    assert_eq!(header, COLUMNS.join(","));

    let rows = read_records(&output).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cadastral_id, record.cadastral_id);
}

#[tokio::test]
async fn test_shared_parcel_is_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_addresses(&server, "4120 TAU", address_page("Fjordgata", &["1A", "1B"])).await;
    mount_search(&server, "Fjordgata 1A, 4120 TAU", json!([hit("1130", 12, 345)])).await;
    mount_search(&server, "Fjordgata 1B, 4120 TAU", json!([hit("1130", 12, 345)])).await;

    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel(COORDINATES_25832, "1 204 m²"),
    );

    let mut config = pipeline_config(&server, temp_dir.path());
    config.dedup_output = Some(temp_dir.path().join("data_unique.csv"));
    let pipeline = build_pipeline(config.clone());

    let areas = vec![PostalArea::new("4120", "TAU")];
    let report = pipeline.harvest(&areas, &mut session, |_| {}).await.unwrap();

    assert_eq!(report.total_rows, 2);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].address, "Fjordgata 1A 4120 TAU");
    assert_eq!(report.duplicates, vec!["Fjordgata 1B 4120 TAU"]);
    assert_eq!(report.stats.duplicates, 1);

    assert_eq!(read_records(&config.output).unwrap().len(), 2);
    let unique = read_records(config.dedup_output.as_ref().unwrap()).unwrap();
    assert_eq!(unique.len(), 1);
    assert_eq!(unique[0].area_m2, 1204.0);
}

#[tokio::test]
async fn test_session_closed_after_run() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_addresses(&server, "4120 TAU", address_page("Fjordgata", &["3"])).await;
    mount_search(&server, "Fjordgata 3, 4120 TAU", json!([])).await;

    let mut session = FakeSession::new();
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));

    let areas = vec![PostalArea::new("4120", "TAU")];
    pipeline.harvest(&areas, &mut session, |_| {}).await.unwrap();

    assert!(session.closed);
    assert!(session.visited.is_empty());
}

#[tokio::test]
async fn test_progress_reports_every_address() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_addresses(&server, "4120 TAU", address_page("Fjordgata", &["1", "2", "3"])).await;
    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([])).await;
    mount_search(&server, "Fjordgata 2, 4120 TAU", json!([])).await;
    mount_search(&server, "Fjordgata 3, 4120 TAU", json!([])).await;

    let mut session = FakeSession::new();
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));

    let mut seen = Vec::new();
    let areas = vec![PostalArea::new("4120", "TAU")];
    pipeline
        .harvest(&areas, &mut session, |progress| {
            seen.push((progress.index, progress.total, progress.state.to_string()));
        })
        .await
        .unwrap();

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].0, 1);
    assert_eq!(seen[2].0, 3);
    assert!(seen.iter().all(|(_, total, _)| *total == 3));
}

// ============================================================================
// Limit and Cancellation
// ============================================================================

#[tokio::test]
async fn test_limit_processes_first_addresses_only() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([])).await;

    let area = PostalArea::new("4120", "TAU");
    let addresses = vec![
        Address::new("Fjordgata", "1", &area),
        Address::new("Fjordgata", "2", &area),
        Address::new("Fjordgata", "3", &area),
    ];

    let mut config = pipeline_config(&server, temp_dir.path());
    config.limit = Some(1);
    let pipeline = build_pipeline(config);

    let mut session = FakeSession::new();
    let report = pipeline.run(&addresses, &mut session, |_| {}).await.unwrap();

    assert_eq!(report.stats.total_addresses, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].address.street_number, "1");
}

#[tokio::test]
async fn test_cancellation_stops_between_addresses() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;
    mount_search(&server, "Fjordgata 2, 4120 TAU", json!([hit("1130", 12, 346)])).await;

    let area = PostalArea::new("4120", "TAU");
    let addresses = vec![
        Address::new("Fjordgata", "1", &area),
        Address::new("Fjordgata", "2", &area),
    ];

    let mut session = FakeSession::new()
        .with_page(
            detail_url("1130/12/345/0/0"),
            details_panel(COORDINATES_25832, "650 m²"),
        )
        .with_page(
            detail_url("1130/12/346/0/0"),
            details_panel(COORDINATES_25832, "700 m²"),
        );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let config = pipeline_config(&server, temp_dir.path());
    let output = config.output.clone();
    let pipeline = build_pipeline(config).with_cancellation(cancel_rx);

    let report = pipeline
        .run(&addresses, &mut session, |_| {
            let _ = cancel_tx.send(true);
        })
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_rows, 1);
    assert_eq!(report.records[0].area_m2, 650.0);
    assert!(session.closed);

    // Partial results still reach disk
    assert_eq!(read_records(&output).unwrap().len(), 1);
}

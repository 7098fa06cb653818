//! Error handling and failure isolation scenarios
//!
//! Every per-address failure must leave the rest of the run intact; only an
//! output that cannot be written aborts.

use matrikkel::config::AmbiguityPolicy;
use matrikkel::crawler::pipeline::Stage;
use matrikkel::error::{Error, ErrorCategory, HarvestErrorTrait};
use matrikkel::models::{Address, AddressState, PostalArea};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::*;
use crate::common::{details_panel, titled_details_panel, FakeSession};

fn tau(number: &str) -> Address {
    Address::new("Fjordgata", number, &PostalArea::new("4120", "TAU"))
}

// ============================================================================
// Discovery Failures
// ============================================================================

#[tokio::test]
async fn test_failing_postal_area_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ADDRESS_PATH))
        .and(query_param("address", "4100 JORPELAND"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_addresses(&server, "4120 TAU", address_page("Fjordgata", &["1"])).await;
    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;

    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel(COORDINATES_25832, "650 m²"),
    );
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));

    let areas = vec![
        PostalArea::new("4100", "JORPELAND"),
        PostalArea::new("4120", "TAU"),
    ];
    let report = pipeline.harvest(&areas, &mut session, |_| {}).await.unwrap();

    assert_eq!(report.failed_areas.len(), 1);
    assert_eq!(report.failed_areas[0].area.postal_code, "4100");
    assert_eq!(report.stats.failed_areas, 1);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_malformed_address_page_fails_area() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ADDRESS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));

    let discovery = pipeline.discover(&[PostalArea::new("4120", "TAU")]).await;
    assert!(discovery.addresses.is_empty());
    assert_eq!(discovery.failed_areas.len(), 1);
    assert!(discovery.failed_areas[0].message.contains("Malformed JSON"));
}

// ============================================================================
// Per-Address Failures
// ============================================================================

#[tokio::test]
async fn test_ambiguous_match_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(
        &server,
        "Fjordgata 1, 4120 TAU",
        json!([hit("1130", 12, 345), hit("1130", 12, 346)]),
    )
    .await;

    let mut config = pipeline_config(&server, temp_dir.path());
    config.ambiguity = AmbiguityPolicy::Reject;
    let pipeline = build_pipeline(config);

    let mut session = FakeSession::new();
    let err = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap_err();

    assert_eq!(err.0, Stage::Resolve);
    assert!(matches!(err.1, Error::Ambiguous { ref candidates, .. } if candidates.len() == 2));
    assert!(err.1.is_recoverable());
}

#[tokio::test]
async fn test_ambiguous_match_takes_first() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(
        &server,
        "Fjordgata 1, 4120 TAU",
        json!([hit("1130", 12, 345), hit("1130", 12, 346)]),
    )
    .await;

    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel(COORDINATES_25832, "650 m²"),
    );
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));

    let record = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap();
    assert_eq!(record.cadastral_id.usage_no, "345");
}

#[tokio::test]
async fn test_cadastral_api_outage_is_upstream_failure() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CADASTRAL_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));
    let mut session = FakeSession::new();
    let report = pipeline
        .run(&[tau("1"), tau("2")], &mut session, |_| {})
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| f.category == ErrorCategory::Upstream && f.stage == Stage::Resolve));
    assert!(report
        .failures
        .iter()
        .all(|f| f.last_state == AddressState::Pending));
}

#[tokio::test]
async fn test_panel_never_renders() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;

    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));
    let mut session = FakeSession::new();
    let (stage, err) = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap_err();

    assert_eq!(stage, Stage::Scrape);
    assert_eq!(err.category(), ErrorCategory::Scrape);
    assert_eq!(session.visited, vec![detail_url("1130/12/345/0/0")]);
}

#[tokio::test]
async fn test_panel_for_another_parcel_is_not_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 99, 1)])).await;

    // The browser still shows the previous parcel's panel
    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));
    let mut session = FakeSession::new().with_page(
        detail_url("1130/99/1/0/0"),
        titled_details_panel("1130-12/345", COORDINATES_25832, "650 m²"),
    );
    let (stage, err) = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap_err();

    assert_eq!(stage, Stage::Scrape);
    assert_eq!(err.category(), ErrorCategory::Scrape);
}

#[tokio::test]
async fn test_unparseable_area_fails_scrape() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;

    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));
    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel(COORDINATES_25832, "Ikke beregnet"),
    );
    let (stage, err) = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap_err();

    assert_eq!(stage, Stage::Scrape);
    assert!(err.to_string().contains("Ikke beregnet"));
}

#[tokio::test]
async fn test_unsupported_reference_system_fails_transform() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    mount_search(&server, "Fjordgata 1, 4120 TAU", json!([hit("1130", 12, 345)])).await;

    let pipeline = build_pipeline(pipeline_config(&server, temp_dir.path()));
    let mut session = FakeSession::new().with_page(
        detail_url("1130/12/345/0/0"),
        details_panel("664000 8190000 (3857)", "650 m²"),
    );
    let (stage, err) = pipeline
        .process_address(&tau("1"), &mut session)
        .await
        .unwrap_err();

    assert_eq!(stage, Stage::Transform);
    assert_eq!(err.category(), ErrorCategory::Transform);
}

// ============================================================================
// Fatal Failures
// ============================================================================

#[tokio::test]
async fn test_unwritable_output_is_fatal_and_closes_session() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    // A regular file where the output directory should be
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut config = pipeline_config(&server, temp_dir.path());
    config.output = blocker.join("data.csv");
    let pipeline = build_pipeline(config);

    let mut session = FakeSession::new();
    let err = pipeline.run(&[], &mut session, |_| {}).await.unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert!(session.closed);
}

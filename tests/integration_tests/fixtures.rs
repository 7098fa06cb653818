//! Test fixtures for integration tests
//!
//! Mock API mounting and pipeline construction shared by the scenarios

use std::path::Path;
use std::time::Duration;

use matrikkel::crawler::fetcher::ApiFetcher;
use matrikkel::crawler::pipeline::{HarvestPipeline, PipelineConfig};
use matrikkel::parser::DetailScraper;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ADDRESS_PATH: &str = "/api/v1/grouped_addresses.json";
pub const CADASTRAL_PATH: &str = "/api/soekEtterEiendom";
pub const DETAIL_BASE: &str = "https://seeiendom.test/eiendom";

/// Projected position of a parcel near Jørpeland, EPSG:25832
pub const COORDINATES_25832: &str = "6540659.780 325806.144 (25832)";
pub const EXPECTED_LATITUDE: f64 = 58.97;
pub const EXPECTED_LONGITUDE: f64 = 5.97;

/// Grouped-address page with one street and the given house numbers
pub fn address_page(street: &str, numbers: &[&str]) -> Value {
    let points: Vec<Value> = numbers
        .iter()
        .map(|n| json!({ "street_number": n }))
        .collect();
    json!({
        "groupedAddresses": [
            { "street": street, "address_points": points }
        ]
    })
}

/// One cadastral search hit
pub fn hit(municipality: &str, parcel: u32, usage: u32) -> Value {
    json!({
        "kommunenr": municipality,
        "gaardsnr": parcel,
        "bruksnr": usage,
        "festenr": 0,
        "seksjonsnr": 0
    })
}

pub async fn mount_addresses(server: &MockServer, area_query: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(ADDRESS_PATH))
        .and(query_param("address", area_query))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_search(server: &MockServer, searchstring: &str, hits: Value) {
    Mock::given(method("GET"))
        .and(path(CADASTRAL_PATH))
        .and(query_param("searchstring", searchstring))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits))
        .mount(server)
        .await;
}

/// Pipeline pointed at `server`, writing into `dir`
pub fn pipeline_config(server: &MockServer, dir: &Path) -> PipelineConfig {
    PipelineConfig {
        address_api_url: format!("{}{ADDRESS_PATH}", server.uri()),
        cadastral_api_url: format!("{}{CADASTRAL_PATH}", server.uri()),
        detail_base_url: DETAIL_BASE.to_string(),
        page_size: 100,
        max_pages: 3,
        output: dir.join("data.csv"),
        wait_timeout: Duration::from_millis(200),
        ..PipelineConfig::default()
    }
}

pub fn build_pipeline(config: PipelineConfig) -> HarvestPipeline {
    let fetcher = ApiFetcher::with_config(100, 0, Duration::from_secs(5))
        .unwrap()
        .with_base_delay(1);
    let scraper = DetailScraper::new(config.detail_base_url.clone(), config.wait_timeout)
        .with_poll_interval(Duration::from_millis(10));
    HarvestPipeline::new(config, fetcher).with_scraper(scraper)
}

pub fn detail_url(path: &str) -> String {
    format!("{DETAIL_BASE}/{path}")
}

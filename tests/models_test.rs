//! Tests for models module

use matrikkel::models::{Address, AddressState, CadastralId, HarvestStats, PostalArea};

#[test]
fn test_address_forms() {
    let area = PostalArea::new("4100", "JØRPELAND");
    let address = Address::new(" Fjordgata ", "12B", &area);

    assert_eq!(address.to_string(), "Fjordgata 12B 4100 JØRPELAND");
    assert_eq!(address.search_query(), "Fjordgata 12B, 4100 JØRPELAND");
    assert_eq!(area.query(), "4100 JØRPELAND");
}

#[test]
fn test_cadastral_id_equality_drives_dedup() {
    let a = CadastralId::new("1130", "12", "345", "0", "0");
    let b = CadastralId::new("1130", "12", "345", "0", "0");
    let c = CadastralId::new("1130", "12", "345", "0", "1");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(c.to_string(), "1130/12/345/0/1");
}

#[test]
fn test_stats_rates() {
    let mut stats = HarvestStats::new(10);
    stats.recorded = 6;
    stats.failed = 2;
    assert_eq!(stats.failure_rate(), 25.0);

    stats.duration_secs = 30;
    assert_eq!(stats.rate_per_minute(), 16.0);
}

#[test]
fn test_state_labels() {
    assert_eq!(AddressState::Pending.to_string(), "pending");
    assert_eq!(AddressState::Transformed.to_string(), "transformed");
}

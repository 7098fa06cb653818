//! Reprojection tests
//!
//! Reference values were computed independently with the Krüger series and
//! agree with PROJ to the millimeter.

use matrikkel::transform::{CoordinateTransformer, WGS84_GEOGRAPHIC};
use matrikkel::utils::error::TransformError;
use proptest::prelude::*;

#[test]
fn test_known_point_southern_hemisphere() {
    let transformer = CoordinateTransformer::new();
    let (lat, lon) = transformer
        .transform(334_368.634, 6_250_948.345, 32756, WGS84_GEOGRAPHIC)
        .unwrap();
    assert!((lat + 33.8688).abs() < 1e-6, "lat = {lat}");
    assert!((lon - 151.2093).abs() < 1e-6, "lon = {lon}");
}

#[test]
fn test_out_of_domain_rejections() {
    let transformer = CoordinateTransformer::new();

    assert!(matches!(
        transformer.transform(1.0, 2.0, 3857, WGS84_GEOGRAPHIC),
        Err(TransformError::Unsupported { source_epsg: 3857, .. })
    ));
    assert!(matches!(
        transformer.transform(325_806.0, 6_540_659.0, 25832, 4258),
        Err(TransformError::Unsupported { target_epsg: 4258, .. })
    ));
    assert!(matches!(
        transformer.transform(325_806.0, 6.0e9, 25832, WGS84_GEOGRAPHIC),
        Err(TransformError::OutOfRange { .. })
    ));
}

proptest! {
    #[test]
    fn prop_round_trip_zone_33(lat in 58.0f64..71.0, lon in 12.0f64..18.0) {
        let transformer = CoordinateTransformer::new();
        let (e, n) = transformer.to_projected(lat, lon, 25833).unwrap();
        let (lat_back, lon_back) = transformer.transform(e, n, 25833, WGS84_GEOGRAPHIC).unwrap();

        prop_assert!((lat - lat_back).abs() < 1e-7);
        prop_assert!((lon - lon_back).abs() < 1e-7);
    }
}

//! Projected to geographic coordinate conversion in pure Rust
//!
//! Supported sources:
//! - ETRS89 / UTM zones 28N-38N (EPSG:25828-25838), the Norwegian EUREF89 grids
//! - WGS84 / UTM north (EPSG:32601-32660) and south (EPSG:32701-32760)
//!
//! Supported target: WGS84 geographic (EPSG:4326). ETRS89 and WGS84 are treated
//! as identical, which is within a meter in Norway.

pub mod ellipsoid;
pub mod utm;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub use ellipsoid::Ellipsoid;
pub use utm::UtmProjection;

use crate::utils::error::TransformError;

/// WGS84 geographic latitude/longitude
pub const WGS84_GEOGRAPHIC: u32 = 4326;

/// Projecting an inverse result back must land this close, in meters
const ROUND_TRIP_TOLERANCE_M: f64 = 0.01;

/// Widest accepted distance from the zone's central meridian, in degrees
///
/// Nominal zones are 3 degrees to each side; Norway runs UTM33 across the
/// whole country, which puts the west coast about 10.5 degrees out.
const MAX_ZONE_OFFSET_DEG: f64 = 12.0;

/// Projection behind a supported projected EPSG code
#[must_use]
pub fn projection_for(epsg: u32) -> Option<UtmProjection> {
    match epsg {
        25828..=25838 => UtmProjection::new(Ellipsoid::GRS80, (epsg - 25800) as u8, false),
        32601..=32660 => UtmProjection::new(Ellipsoid::WGS84, (epsg - 32600) as u8, false),
        32701..=32760 => UtmProjection::new(Ellipsoid::WGS84, (epsg - 32700) as u8, true),
        _ => None,
    }
}

/// Absolute longitude difference in degrees, wrapped to [0, 180]
fn meridian_offset(longitude: f64, central_meridian: f64) -> f64 {
    let diff = (longitude - central_meridian).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Converts scraped projected coordinates to latitude/longitude
///
/// Projections are built once per source code and reused.
#[derive(Debug, Default)]
pub struct CoordinateTransformer {
    cache: RwLock<HashMap<u32, Arc<UtmProjection>>>,
}

impl CoordinateTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(easting, northing)` in `source_epsg` to `(latitude, longitude)`
    ///
    /// # Errors
    ///
    /// `TransformError::Unsupported` for an unknown pair, `NonFinite` for NaN
    /// or infinite input and `OutOfRange` when the result is not a valid
    /// geographic position
    pub fn transform(
        &self,
        easting: f64,
        northing: f64,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(f64, f64), TransformError> {
        if !easting.is_finite() || !northing.is_finite() {
            return Err(TransformError::NonFinite { easting, northing });
        }

        let projection = self.projection(source_epsg, target_epsg)?;
        let (latitude, longitude) = projection.inverse(easting, northing);
        let out_of_range = TransformError::OutOfRange {
            latitude,
            longitude,
        };

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(out_of_range);
        }

        // Swapped easting and northing still invert to a real position, but far
        // outside the zone
        if meridian_offset(longitude, projection.central_meridian()) > MAX_ZONE_OFFSET_DEG {
            return Err(out_of_range);
        }

        // The inverse is periodic in northing; a point outside the projection's
        // domain maps to a plausible position that does not project back.
        let (e_back, n_back) = projection.forward(latitude, longitude);
        if (e_back - easting).abs() > ROUND_TRIP_TOLERANCE_M
            || (n_back - northing).abs() > ROUND_TRIP_TOLERANCE_M
        {
            return Err(out_of_range);
        }

        Ok((latitude, longitude))
    }

    /// `(latitude, longitude)` to `(easting, northing)` in `projected_epsg`
    ///
    /// # Errors
    ///
    /// `TransformError::Unsupported` for an unknown code, `NonFinite` for bad
    /// input and `OutOfRange` for a position outside the geographic domain
    pub fn to_projected(
        &self,
        latitude: f64,
        longitude: f64,
        projected_epsg: u32,
    ) -> Result<(f64, f64), TransformError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(TransformError::OutOfRange {
                latitude,
                longitude,
            });
        }

        let projection = self.projection(projected_epsg, WGS84_GEOGRAPHIC)?;
        let (easting, northing) = projection.forward(latitude, longitude);

        if !easting.is_finite() || !northing.is_finite() {
            return Err(TransformError::NonFinite { easting, northing });
        }

        Ok((easting, northing))
    }

    /// Number of projections built so far
    #[must_use]
    pub fn cached_projections(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn projection(
        &self,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<Arc<UtmProjection>, TransformError> {
        let unsupported = TransformError::Unsupported {
            source_epsg,
            target_epsg,
        };
        if target_epsg != WGS84_GEOGRAPHIC {
            return Err(unsupported);
        }

        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&source_epsg)
        {
            return Ok(Arc::clone(found));
        }

        let projection = Arc::new(projection_for(source_epsg).ok_or(unsupported)?);
        tracing::debug!(
            source_epsg,
            zone = projection.zone(),
            south = projection.is_south(),
            "Built reprojection context"
        );

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source_epsg, Arc::clone(&projection));

        Ok(projection)
    }
}

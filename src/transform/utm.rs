//! Universal Transverse Mercator
//!
//! Krüger series to fourth order in the third flattening, which stays well
//! below a millimeter inside a zone. Angles are in degrees at the API and
//! radians inside.

use super::ellipsoid::Ellipsoid;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// One UTM zone on one ellipsoid
#[derive(Debug, Clone, PartialEq)]
pub struct UtmProjection {
    zone: u8,
    south: bool,
    /// Central meridian, radians
    lon0: f64,
    /// Rectifying radius
    rect_radius: f64,
    e: f64,
    alpha: [f64; 4],
    beta: [f64; 4],
    delta: [f64; 4],
}

impl UtmProjection {
    /// Zone 1..=60 on `ellipsoid`, northern or southern hemisphere
    ///
    /// Returns `None` for a zone outside 1..=60.
    #[must_use]
    pub fn new(ellipsoid: Ellipsoid, zone: u8, south: bool) -> Option<Self> {
        if !(1..=60).contains(&zone) {
            return None;
        }

        let n = ellipsoid.third_flattening();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        Some(Self {
            zone,
            south,
            lon0: (f64::from(zone) * 6.0 - 183.0).to_radians(),
            rect_radius: ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            e: ellipsoid.eccentricity(),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0,
                61.0 * n3 / 240.0 - 103.0 * n4 / 140.0,
                49561.0 * n4 / 161_280.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0,
                n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0,
                17.0 * n3 / 480.0 - 37.0 * n4 / 840.0,
                4397.0 * n4 / 161_280.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3 + 116.0 * n4 / 45.0,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0 - 227.0 * n4 / 45.0,
                56.0 * n3 / 15.0 - 136.0 * n4 / 35.0,
                4279.0 * n4 / 630.0,
            ],
        })
    }

    #[must_use]
    pub fn zone(&self) -> u8 {
        self.zone
    }

    #[must_use]
    pub fn is_south(&self) -> bool {
        self.south
    }

    /// Central meridian in degrees
    #[must_use]
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    fn false_northing(&self) -> f64 {
        if self.south {
            FALSE_NORTHING_SOUTH
        } else {
            0.0
        }
    }

    /// `(easting, northing)` in meters to `(latitude, longitude)` in degrees
    #[must_use]
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let scale = K0 * self.rect_radius;
        let xi = (northing - self.false_northing()) / scale;
        let eta = (easting - FALSE_EASTING) / scale;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        // Conformal latitude, then geodetic
        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let phi = self
            .delta
            .iter()
            .enumerate()
            .fold(chi, |acc, (j, d)| acc + d * (2.0 * (j as f64 + 1.0) * chi).sin());

        let lambda = self.lon0 + eta_p.sinh().atan2(xi_p.cos());

        (phi.to_degrees(), lambda.to_degrees())
    }

    /// `(latitude, longitude)` in degrees to `(easting, northing)` in meters
    #[must_use]
    pub fn forward(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let phi = latitude.to_radians();
        let lambda = longitude.to_radians() - self.lon0;

        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
        let xi_p = t.atan2(lambda.cos());
        let eta_p = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let scale = K0 * self.rect_radius;
        (
            FALSE_EASTING + scale * eta,
            self.false_northing() + scale * xi,
        )
    }
}

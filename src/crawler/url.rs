//! Links written into every output row
//!
//! - Detail page: `<detail base>/<municipality>/<parcel>/<usage>/<leasehold>/<section>`
//! - Map viewer: a fragment route centred on the raw projected coordinates

use crate::models::{CadastralId, RawCoordinates};

/// Overlay layers shown by the map viewer
const MAP_LAYERS: &str = "1002,1013,1014,1015";

/// Detail page URL for a cadastral identifier
///
/// # Examples
///
/// ```
/// use matrikkel::crawler::url::detail_page_url;
/// use matrikkel::models::CadastralId;
///
/// let id = CadastralId::new("1130", "12", "345", "0", "0");
/// assert_eq!(
///     detail_page_url("https://seeiendom.kartverket.no/eiendom/", &id),
///     "https://seeiendom.kartverket.no/eiendom/1130/12/345/0/0"
/// );
/// ```
#[must_use]
pub fn detail_page_url(base: &str, id: &CadastralId) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id.path())
}

/// Map viewer URL centred on the parcel
///
/// The viewer takes projected coordinates directly: `lat` is the northing,
/// `lon` the easting.
#[must_use]
pub fn map_viewer_url(base: &str, raw: &RawCoordinates) -> String {
    let north = format_coordinate(raw.northing);
    let east = format_coordinate(raw.easting);
    format!(
        "{}/#!?project=seeiendom&lat={north}&lon={east}&markerLat={north}&markerLon={east}\
         &panel=Seeiendom&showSelection=true&p=Seeiendom&layers={MAP_LAYERS}",
        base.trim_end_matches('/')
    )
}

/// Whole meters print without a fractional part
fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

//! Detail page parsing
//!
//! Navigation lives in [`details::DetailScraper`]; everything else here is
//! pure string and HTML handling so it can be tested without a browser.

pub mod details;
pub mod number;
pub mod selectors;

pub use details::{
    extract_details, panel_shows, panel_title, parse_area_cell, parse_coordinate_cell,
    DetailScraper,
};
pub use number::parse_localized_number;
pub use selectors::DETAILS_PANEL;

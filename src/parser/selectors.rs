//! CSS selectors for the property detail page

use lazy_static::lazy_static;
use scraper::Selector;

// Selector strings are literals; a parse failure is a programming error
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Details panel the scraper waits for
pub const DETAILS_PANEL: &str = "#eiendomDetails";

lazy_static! {
    /// Rows of the first property table inside the panel
    pub static ref TABLE_ROWS: Selector = parse_selector!(".eiendom-table-column tr");

    /// Data cells of a row
    pub static ref CELL: Selector = parse_selector!("td");

    /// Parcel heading, e.g. `1130-12/345`
    pub static ref PANEL_TITLE: Selector = parse_selector!(".eiendom-title");
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_selectors_compile() {
        let _ = &*TABLE_ROWS;
        let _ = &*CELL;
        let _ = &*PANEL_TITLE;
        assert!(Selector::parse(DETAILS_PANEL).is_ok());
    }

    #[test]
    fn test_rows_found_in_fragment() {
        let html = Html::parse_fragment(
            r#"<div id="eiendomDetails"><table class="eiendom-table-column">
               <tr><td>a</td></tr><tr><td>b</td></tr></table></div>"#,
        );
        assert_eq!(html.select(&TABLE_ROWS).count(), 2);
    }
}

//! Norwegian-formatted number parsing
//!
//! The detail page prints numbers the Norwegian way: comma as decimal
//! separator, and a space, a no-break space (U+00A0, often as `&nbsp;`) or a
//! narrow no-break space (U+202F) between thousands. A trailing unit such as
//! `m²` is ignored.

/// Parse a localized number like `"1 234,5 m²"`
///
/// A `.` is treated as a thousands separator when a `,` is also present
/// (`"1.234,5"`) and as the decimal point otherwise (`"650.0"`).
///
/// Returns `None` for empty input, text without a leading number, or a
/// non-finite result.
#[must_use]
pub fn parse_localized_number(text: &str) -> Option<f64> {
    let compact: String = text
        .replace("&nbsp;", "")
        .replace("&#160;", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let numeric: String = compact
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'))
        .collect();

    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if numeric.contains(',') {
        numeric.replace('.', "").replace(',', ".")
    } else {
        numeric
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

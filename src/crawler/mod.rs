//! Upstream access and batch orchestration
//!
//! - [`fetcher`] paced, retrying JSON GET client
//! - [`address`] postal area to street addresses
//! - [`cadastral`] street address to cadastral identifier
//! - [`url`] links written into the output rows
//! - [`pipeline`] the per-address state machine tying everything together

pub mod address;
pub mod cadastral;
pub mod fetcher;
pub mod pipeline;
pub mod url;

use serde::{Deserialize, Deserializer};

/// Accept a JSON string or number and keep it as text
///
/// The upstream APIs are not consistent about quoting numeric identifiers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().to_string(),
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "string_or_number")]
        value: String,
    }

    #[test]
    fn test_string_or_number() {
        let p: Probe = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        assert_eq!(p.value, "42");

        let p: Probe = serde_json::from_str(r#"{"value": " 7A "}"#).unwrap();
        assert_eq!(p.value, "7A");

        assert!(serde_json::from_str::<Probe>(r#"{"value": null}"#).is_err());
    }
}

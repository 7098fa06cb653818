//! Address to cadastral identifier resolution
//!
//! The search API answers with an array of candidates. An empty array is a
//! miss, a single element is a match, and several elements are surfaced as
//! [`Resolution::Ambiguous`] so the caller decides what to trust.

use serde::Deserialize;

use crate::config::AmbiguityPolicy;
use crate::crawler::fetcher::ApiFetcher;
use crate::crawler::string_or_number;
use crate::error::{Error, Result};
use crate::models::{Address, CadastralId};

/// One candidate returned by the cadastral search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "string_or_number")]
    pub kommunenr: String,
    #[serde(deserialize_with = "string_or_number")]
    pub gaardsnr: String,
    #[serde(deserialize_with = "string_or_number")]
    pub bruksnr: String,
    #[serde(deserialize_with = "string_or_number", default = "zero")]
    pub festenr: String,
    #[serde(deserialize_with = "string_or_number", default = "zero")]
    pub seksjonsnr: String,
}

fn zero() -> String {
    String::from("0")
}

impl From<SearchHit> for CadastralId {
    fn from(hit: SearchHit) -> Self {
        CadastralId::new(
            hit.kommunenr,
            hit.gaardsnr,
            hit.bruksnr,
            hit.festenr,
            hit.seksjonsnr,
        )
    }
}

/// Outcome of a successful cadastral search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(CadastralId),
    /// Candidates in upstream order; never fewer than two
    Ambiguous(Vec<CadastralId>),
}

impl Resolution {
    /// Build from the raw candidate list
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when there are no candidates
    pub fn from_candidates(query: &str, mut candidates: Vec<CadastralId>) -> Result<Self> {
        match candidates.len() {
            0 => Err(Error::not_found(query)),
            1 => Ok(Self::Unique(candidates.remove(0))),
            _ => Ok(Self::Ambiguous(candidates)),
        }
    }

    /// Collapse to one identifier according to `policy`
    ///
    /// # Errors
    ///
    /// `Error::Ambiguous` under [`AmbiguityPolicy::Reject`]
    pub fn apply(self, policy: AmbiguityPolicy, query: &str) -> Result<CadastralId> {
        match self {
            Self::Unique(id) => Ok(id),
            Self::Ambiguous(mut candidates) => {
                tracing::warn!(
                    query,
                    candidates = candidates.len(),
                    first = %candidates[0],
                    "Ambiguous cadastral match"
                );
                match policy {
                    AmbiguityPolicy::First => Ok(candidates.swap_remove(0)),
                    AmbiguityPolicy::Reject => Err(Error::Ambiguous {
                        query: query.to_string(),
                        candidates,
                    }),
                }
            }
        }
    }
}

/// Resolves addresses through the cadastral search API
pub struct CadastralResolver<'a> {
    fetcher: &'a ApiFetcher,
    base_url: String,
}

impl<'a> CadastralResolver<'a> {
    #[must_use]
    pub fn new(fetcher: &'a ApiFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Search for `address` and classify the answer
    ///
    /// # Errors
    ///
    /// `Error::Upstream` on network or JSON failure, `Error::NotFound` on an
    /// empty result
    pub async fn resolve(&self, address: &Address) -> Result<Resolution> {
        let query = address.search_query();
        let url = ApiFetcher::build_url(&self.base_url, &[("searchstring", query.clone())])?;

        let hits: Vec<SearchHit> = self.fetcher.get_json(&url).await?;
        tracing::debug!(query = %query, hits = hits.len(), "Cadastral search");

        Resolution::from_candidates(&query, hits.into_iter().map(CadastralId::from).collect())
    }
}

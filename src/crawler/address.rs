//! Address enumeration against the grouped-address API
//!
//! One postal area maps to one or more pages of `groupedAddresses`. Every
//! `address_points` entry of a group becomes one [`Address`]. Pagination is
//! bounded by `max_pages` and stops early on a short page.

use std::collections::HashSet;

use serde::Deserialize;

use crate::crawler::fetcher::ApiFetcher;
use crate::crawler::string_or_number;
use crate::models::{Address, PostalArea};
use crate::utils::error::FetchError;

/// Response body of the grouped-address endpoint
#[derive(Debug, Deserialize)]
pub struct GroupedAddressPage {
    #[serde(rename = "groupedAddresses", default)]
    pub grouped_addresses: Vec<AddressGroup>,
}

/// One street inside a postal area
#[derive(Debug, Deserialize)]
pub struct AddressGroup {
    #[serde(default)]
    pub street: String,

    #[serde(default)]
    pub address_points: Vec<AddressPoint>,
}

#[derive(Debug, Deserialize)]
pub struct AddressPoint {
    #[serde(deserialize_with = "string_or_number")]
    pub street_number: String,
}

/// Enumerates street addresses per postal area
pub struct AddressEnumerator<'a> {
    fetcher: &'a ApiFetcher,
    base_url: String,
    page_size: u32,
    max_pages: u32,
}

impl<'a> AddressEnumerator<'a> {
    #[must_use]
    pub fn new(fetcher: &'a ApiFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            page_size: 10_000,
            max_pages: 20,
        }
    }

    /// Set page size and the upper bound on pages per area
    #[must_use]
    pub fn with_paging(mut self, page_size: u32, max_pages: u32) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    /// List every address in `area`, deduplicated in first-seen order
    ///
    /// # Errors
    ///
    /// Any failed or malformed page fails the whole area; addresses collected
    /// from earlier pages are discarded with it.
    pub async fn enumerate(&self, area: &PostalArea) -> Result<Vec<Address>, FetchError> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        let mut page = 1;

        loop {
            if page > self.max_pages {
                tracing::warn!(
                    area = %area,
                    max_pages = self.max_pages,
                    "Reached page limit, address list may be truncated"
                );
                break;
            }

            let body = self.fetch_page(area, page).await?;
            let groups = body.grouped_addresses.len();
            let points: usize = body
                .grouped_addresses
                .iter()
                .map(|group| group.address_points.len())
                .sum();

            if points == 0 {
                tracing::debug!(area = %area, page, "Empty page, stopping pagination");
                break;
            }

            let before = addresses.len();
            for address in flatten(&body, area) {
                if seen.insert(address.clone()) {
                    addresses.push(address);
                }
            }
            let new_addresses = addresses.len() - before;

            tracing::debug!(
                area = %area,
                page,
                groups,
                points,
                new_addresses,
                total = addresses.len(),
                "Processed address page"
            );

            // `per_page` counts address points, not street groups. A short page
            // is the last page. A page that repeats what we already have means
            // the server ignores `page`.
            if points < self.page_size as usize || new_addresses == 0 {
                break;
            }

            page += 1;
        }

        tracing::info!(area = %area, total = addresses.len(), "Enumerated addresses");

        Ok(addresses)
    }

    async fn fetch_page(
        &self,
        area: &PostalArea,
        page: u32,
    ) -> Result<GroupedAddressPage, FetchError> {
        let url = ApiFetcher::build_url(
            &self.base_url,
            &[
                ("address", area.query()),
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
            ],
        )?;

        self.fetcher.get_json(&url).await
    }
}

/// One address per street-number entry; blank streets and numbers are skipped
fn flatten<'p>(
    page: &'p GroupedAddressPage,
    area: &'p PostalArea,
) -> impl Iterator<Item = Address> + 'p {
    page.grouped_addresses
        .iter()
        .filter(|group| !group.street.trim().is_empty())
        .flat_map(move |group| {
            group
                .address_points
                .iter()
                .filter(|point| !point.street_number.trim().is_empty())
                .map(move |point| Address::new(&group.street, &point.street_number, area))
        })
}

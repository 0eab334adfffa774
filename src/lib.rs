//! parts-scout: resale-value scouting for used auto parts.
//!
//! Turns a year/make/model/details query into a normalized list of
//! marketplace listing records, either by scraping the search-results page
//! through a multi-strategy extraction cascade or through the official
//! Browse API when credentials are available. Stateless per request; every
//! failure surfaces as empty items plus a classified reason, never as an
//! error at the boundary.

pub mod assemble;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod price;
pub mod query;
pub mod sources;
pub mod webhook;

pub use models::{
    FailReason, FetchOutcome, ListingRecord, ProbeReport, SearchMeta, SearchMode, SearchQuery,
    SearchResponse,
};
pub use sources::{BrowseApiSource, ListingSource, ScrapeSource};

use tracing::warn;

/// Run a search with the default scrape source. Infallible: construction or
/// pipeline problems come back as a response with `meta.reason` set.
pub async fn search(query: &SearchQuery) -> SearchResponse {
    match ScrapeSource::new() {
        Ok(source) => source.search(query).await,
        Err(e) => {
            warn!(error = %e, "could not construct scrape source");
            SearchResponse::failure(FailReason::Exception, Vec::new(), None)
        }
    }
}

pub mod browse;
pub mod scrape;

pub use browse::BrowseApiSource;
pub use scrape::ScrapeSource;

use crate::models::{SearchQuery, SearchResponse};
use async_trait::async_trait;

/// Common trait for listing sources: the HTML scrape pipeline and the
/// official Browse API are interchangeable behind it
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Run a search. Infallible at this boundary: every failure comes back
    /// as empty items plus a `meta.reason`.
    async fn search(&self, query: &SearchQuery) -> SearchResponse;

    /// Name of the listing source
    fn source_name(&self) -> &'static str;
}

//! The scraping listing source: query -> fetch plan -> cascade -> assembly.

use crate::assemble;
use crate::extract;
use crate::fetch::{FetchConfig, Fetcher};
use crate::models::{FetchOutcome, ProbeReport, SearchQuery, SearchResponse};
use crate::query::{build_search_url, build_search_urls, pages_needed};
use crate::sources::ListingSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

pub struct ScrapeSource {
    fetcher: Fetcher,
}

impl ScrapeSource {
    pub fn new() -> Result<Self> {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_config(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::with_config(config)?,
        })
    }

    /// Debug variant: hit the category-anchored URL once and report raw
    /// upstream diagnostics instead of items
    pub async fn probe(&self, query: &SearchQuery) -> Result<ProbeReport> {
        let url = build_search_url(query, 1, true);
        let (status, body) = self
            .fetcher
            .probe(&url)
            .await
            .context("Probe request failed")?;
        let count = extract::extract(&body).len();
        Ok(ProbeReport {
            upstream_url: url,
            status,
            bytes: body.len(),
            count,
        })
    }

    async fn run(&self, query: &SearchQuery) -> SearchResponse {
        let variants = build_search_urls(query, 1);
        let report = self.fetcher.fetch_listings(&variants).await;

        let (first_page, winning_url) = match report.outcome {
            FetchOutcome::Success { html, url } => (html, url),
            FetchOutcome::Failure { reason } => {
                return SearchResponse::failure(reason, report.tried, report.last_tried);
            }
        };

        let mut pages = vec![first_page];
        let mut upstream = report.tried.clone();

        // Pagination reuses the pair that already worked; those fetches run
        // concurrently since a failure on one page does not taint the rest
        let extra_pages = pages_needed(query.limit);
        if extra_pages > 1 {
            if let Some(ua) = report.winning_ua.as_deref() {
                let category_anchored = winning_url.contains("_sacat=");
                let page_urls: Vec<String> = (2..=extra_pages)
                    .map(|n| build_search_url(query, n, category_anchored))
                    .collect();
                debug!(pages = page_urls.len(), "fetching additional result pages");
                upstream.extend(page_urls.iter().cloned());
                pages.extend(self.fetcher.fetch_pages(&page_urls, ua).await);
            }
        }

        let mut response = assemble::assemble(&pages, query);
        response.meta.upstream = upstream;
        info!(
            count = response.meta.count,
            pages = pages.len(),
            "search assembled"
        );
        response
    }
}

#[async_trait]
impl ListingSource for ScrapeSource {
    async fn search(&self, query: &SearchQuery) -> SearchResponse {
        self.run(query).await
    }

    fn source_name(&self) -> &'static str {
        "ebay-scrape"
    }
}

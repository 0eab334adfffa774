//! Official Browse API listing source.
//!
//! Schema-stable alternative to the scrape pipeline: a client-credentials
//! OAuth grant, then a structured item-summary search. No cascade needed;
//! the response shape is documented. Used interchangeably with the scrape
//! source when API credentials are configured.

use crate::assemble;
use crate::models::{
    FailReason, ListingRecord, SearchMeta, SearchMode, SearchQuery, SearchResponse,
};
use crate::sources::ListingSource;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
const SEARCH_URL: &str = "https://api.ebay.com/buy/browse/v1/item_summary/search";
const DEFAULT_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

#[derive(Debug, Clone)]
pub struct BrowseCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl BrowseCredentials {
    /// Read credentials from the environment, the way the deployment
    /// configures them
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("EBAY_CLIENT_ID").context("EBAY_CLIENT_ID not set")?;
        let client_secret =
            std::env::var("EBAY_CLIENT_SECRET").context("EBAY_CLIENT_SECRET not set")?;
        let scope = std::env::var("EBAY_API_SCOPE").unwrap_or_else(|_| DEFAULT_SCOPE.to_string());
        Ok(Self {
            client_id,
            client_secret,
            scope,
        })
    }
}

pub struct BrowseApiSource {
    client: Client,
    credentials: BrowseCredentials,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    title: Option<String>,
    price: Option<ApiPrice>,
    #[serde(default)]
    thumbnail_images: Vec<ApiImage>,
    item_web_url: Option<String>,
    item_end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPrice {
    value: Option<Value>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiImage {
    image_url: Option<String>,
}

impl BrowseApiSource {
    pub fn new(credentials: BrowseCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(BrowseCredentials::from_env()?)
    }

    /// Client-credentials grant; tokens are short-lived and fetched fresh
    /// per request, nothing is cached
    async fn token(&self) -> Result<String> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.credentials.scope.as_str()),
            ])
            .send()
            .await
            .context("Token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Token fetch failed: {} {}", status, body);
        }

        let token: TokenResponse = response.json().await.context("Malformed token response")?;
        Ok(token.access_token)
    }

    async fn fetch_items(&self, query: &SearchQuery) -> Result<Vec<ListingRecord>> {
        let token = self.token().await?;

        // Sold mode sorts by end time descending for recency; the API caps
        // differ by mode the same way the original deployment used them
        let (limit, sort) = match query.mode {
            SearchMode::Sold => (20usize, "-endTime"),
            SearchMode::Active => (40usize, "END_TIME"),
        };

        let keywords = query.keywords();
        let limit = limit.to_string();
        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&token)
            .query(&[
                ("q", keywords.as_str()),
                ("filter", "conditions:{USED}"),
                ("limit", limit.as_str()),
                ("sort", sort),
            ])
            .send()
            .await
            .context("Browse API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Browse API failed: {} {}", status, body);
        }

        let payload: BrowseResponse = response
            .json()
            .await
            .context("Malformed Browse API response")?;
        debug!(count = payload.item_summaries.len(), "browse api returned summaries");

        Ok(payload
            .item_summaries
            .into_iter()
            .filter_map(summary_to_record)
            .collect())
    }
}

/// Map one API item summary to the common record shape; summaries without
/// a title or web URL are dropped like any other invalid record
fn summary_to_record(summary: ItemSummary) -> Option<ListingRecord> {
    let title = summary.title.filter(|t| !t.trim().is_empty())?;
    let link = summary.item_web_url.filter(|u| !u.is_empty())?;

    let (price, currency) = match summary.price {
        Some(p) => (
            p.value.map(scalar_to_string).unwrap_or_default(),
            p.currency,
        ),
        None => (String::new(), None),
    };

    let image = summary
        .thumbnail_images
        .into_iter()
        .find_map(|img| img.image_url);

    Some(ListingRecord {
        title,
        price,
        currency,
        image,
        link,
        sold_date: summary.item_end_date,
    })
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl ListingSource for BrowseApiSource {
    async fn search(&self, query: &SearchQuery) -> SearchResponse {
        match self.fetch_items(query).await {
            Ok(records) => {
                let items = assemble::finalize(records, query);
                let count = items.len();
                SearchResponse {
                    items,
                    meta: SearchMeta {
                        count,
                        upstream: vec![SEARCH_URL.to_string()],
                        reason: None,
                        last_tried: None,
                        fetched_at: chrono::Utc::now(),
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "browse api search failed");
                SearchResponse::failure(
                    FailReason::UpstreamFailed,
                    vec![SEARCH_URL.to_string()],
                    None,
                )
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "ebay-browse-api"
    }
}

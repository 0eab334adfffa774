use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which slice of the marketplace a search targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Historical, ended transactions (resale-value estimation)
    Sold,
    /// Currently-for-sale listings
    Active,
}

/// One scraped or API-returned marketplace entry.
///
/// `link` is the record's identity: two records with the same link are the
/// same listing and collapse to one. A record without a title or link is
/// invalid and never reaches output. `price` may be empty ("unknown", not
/// zero) in permissive extraction passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub title: String,
    /// Numeric string with currency symbols/commas stripped; "" when unknown
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub link: String,
    /// Human-readable date scraped from listing captions, sold mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_date: Option<String>,
}

/// Search parameters, built fresh per request and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub year: String,
    pub make: String,
    pub model: String,
    pub details: String,
    pub mode: SearchMode,
    /// Apply the junkyard price band upstream and server-side
    pub junkyard: bool,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            year: String::new(),
            make: String::new(),
            model: String::new(),
            details: String::new(),
            mode: SearchMode::Sold,
            junkyard: false,
            price_min: None,
            price_max: None,
            limit: 40,
        }
    }
}

impl SearchQuery {
    /// Free-text keyword string sent upstream: "year make model details"
    pub fn keywords(&self) -> String {
        [&self.year, &self.make, &self.model, &self.details]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Effective price band: explicit bounds, or the junkyard defaults when
    /// the toggle is set without bounds. `None` means no band at all.
    pub fn price_band(&self) -> Option<(f64, f64)> {
        if !self.junkyard {
            return None;
        }
        Some((
            self.price_min.unwrap_or(JUNKYARD_MIN),
            self.price_max.unwrap_or(JUNKYARD_MAX),
        ))
    }
}

/// Default junkyard band: the resale segment worth pulling parts for
pub const JUNKYARD_MIN: f64 = 100.0;
pub const JUNKYARD_MAX: f64 = 400.0;

/// Why a search came back empty. Surfaced as `meta.reason`, never thrown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Upstream returned 429/403
    RateLimited,
    /// Non-2xx other than the above, after retry
    UpstreamFailed,
    /// Human-verification content detected in the response body
    BotCheck,
    /// Fetch succeeded but all extraction strategies yielded zero records
    EmptyParse,
    /// Per-attempt or overall budget exceeded
    Timeout,
    /// Any other unexpected failure caught at the top level
    Exception,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailReason::RateLimited => "rate_limited",
            FailReason::UpstreamFailed => "upstream_failed",
            FailReason::BotCheck => "bot_check",
            FailReason::EmptyParse => "empty_parse",
            FailReason::Timeout => "timeout",
            FailReason::Exception => "exception",
        };
        f.write_str(s)
    }
}

/// Tagged result of one upstream fetch plan; drives caller-visible
/// messaging and is never surfaced as an error
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// 2xx body that parsed to at least one record, plus the URL that won
    Success { html: String, url: String },
    Failure { reason: FailReason },
}

/// Observability metadata attached to every response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub count: usize,
    /// URLs tried upstream, in order
    pub upstream: Vec<String>,
    /// Absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailReason>,
    /// Variant that triggered a terminal failure (bot-check etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tried: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// What `search()` always returns: items plus meta, empty items with a
/// reason on every failure path, so callers never special-case transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<ListingRecord>,
    pub meta: SearchMeta,
}

impl SearchResponse {
    pub fn failure(reason: FailReason, upstream: Vec<String>, last_tried: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            meta: SearchMeta {
                count: 0,
                upstream,
                reason: Some(reason),
                last_tried,
                fetched_at: Utc::now(),
            },
        }
    }
}

/// Debug-variant payload: upstream diagnostics instead of items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub upstream_url: String,
    pub status: u16,
    pub bytes: usize,
    pub count: usize,
}

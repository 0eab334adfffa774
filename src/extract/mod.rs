//! Multi-strategy listing extraction.
//!
//! No single parse is reliable across the marketplace's concurrent template
//! generations (legacy vs redesigned results pages, server-rendered vs
//! JSON-hydrated). The cascade tries four independent strategies, most
//! precise first, and stops at the first one that yields records. Each
//! strategy swallows its own failures and returns an empty list so the next
//! one gets a chance; `extract` itself never fails.

pub mod anchors;
pub mod embedded;
pub mod json_ld;
pub mod selectors;
pub mod sold_date;

use crate::models::ListingRecord;
use std::collections::HashSet;
use tracing::debug;

/// Placeholder titles the marketplace injects into non-listing tiles
pub(crate) const PLACEHOLDER_TITLES: [&str; 2] = ["shop on ebay", "new listing"];

/// Run the full cascade over one HTML document. Pure and deterministic for
/// identical input; duplicate links collapse to the first occurrence.
pub fn extract(html: &str) -> Vec<ListingRecord> {
    let strategies: [(&str, fn(&str) -> Vec<ListingRecord>); 4] = [
        ("selectors", selectors::extract),
        ("json-ld", json_ld::extract),
        ("embedded-json", embedded::extract),
        ("anchor-scan", anchors::extract),
    ];

    for (name, strategy) in strategies {
        let records = strategy(html);
        if !records.is_empty() {
            debug!(strategy = name, count = records.len(), "extraction strategy produced records");
            return dedup_by_link(records);
        }
        debug!(strategy = name, "extraction strategy empty, falling through");
    }

    Vec::new()
}

/// Collapse records sharing a canonical link, keeping the first occurrence
/// and its fields, preserving relative order
pub fn dedup_by_link(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.link.clone()))
        .collect()
}

/// Canonical form of a listing URL: item-detail links drop their tracking
/// query string so the same listing reached via different page variants
/// dedups to one record
pub(crate) fn canonical_link(raw: &str) -> String {
    let absolute = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else if raw.starts_with('/') {
        format!("https://www.ebay.com{}", raw)
    } else {
        raw.to_string()
    };

    if absolute.contains("/itm/") {
        if let Some(pos) = absolute.find('?') {
            return absolute[..pos].to_string();
        }
    }
    absolute
}

/// True for tile titles that are navigation chrome rather than listings
pub(crate) fn is_placeholder_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    lower.is_empty() || PLACEHOLDER_TITLES.iter().any(|p| lower == *p)
}

/// Collapse runs of whitespace (including newlines from pretty-printed
/// markup) into single spaces
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

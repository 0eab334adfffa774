//! Search-URL construction for the marketplace's filter/sort query grammar.
//!
//! Two variants are produced per query: a category-anchored URL (restricted
//! to Parts & Accessories) and a generic one. Category anchoring sometimes
//! returns an empty page for niche part queries while the generic path
//! succeeds, and vice versa, so the fetch plan tries both.

use crate::models::{SearchMode, SearchQuery};

const SEARCH_BASE: &str = "https://www.ebay.com/sch/i.html";
/// eBay Motors > Parts & Accessories
const CATEGORY_PARTS_ACCESSORIES: &str = "6030";
/// Item condition filter value for "Used"
const CONDITION_USED: &str = "3000";
/// Sort: ended/listed most recently first
const SORT_RECENT: &str = "13";

/// Platform-enforced page-size range
const PAGE_SIZE_MIN: usize = 10;
const PAGE_SIZE_MAX: usize = 240;

/// Build the ordered URL variants for one results page. Category-anchored
/// first; it is the more precise variant when it works.
pub fn build_search_urls(query: &SearchQuery, page: usize) -> Vec<String> {
    vec![
        build_search_url(query, page, true),
        build_search_url(query, page, false),
    ]
}

/// Build a single search URL. `page` is clamped to >= 1 and the page size
/// to the platform's allowed range.
pub fn build_search_url(query: &SearchQuery, page: usize, category_anchored: bool) -> String {
    let mut params: Vec<(String, String)> = Vec::new();
    params.push(("_nkw".into(), query.keywords()));

    if category_anchored {
        params.push(("_sacat".into(), CATEGORY_PARTS_ACCESSORIES.into()));
    }

    match query.mode {
        SearchMode::Sold => {
            params.push(("LH_Sold".into(), "1".into()));
            params.push(("LH_Complete".into(), "1".into()));
            params.push(("LH_ItemCondition".into(), CONDITION_USED.into()));
            params.push(("_sop".into(), SORT_RECENT.into()));
        }
        SearchMode::Active => {
            // No completion filters; default relevance sort
        }
    }

    // Band parameters are omitted entirely when the toggle is off --
    // absence, not a zero-width band.
    if let Some((lo, hi)) = query.price_band() {
        params.push(("_udlo".into(), format_bound(lo)));
        params.push(("_udhi".into(), format_bound(hi)));
    }

    params.push(("_ipg".into(), page_size(query.limit).to_string()));
    params.push(("_pgn".into(), page.max(1).to_string()));

    let qs = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", SEARCH_BASE, qs)
}

/// Page size requested upstream for a given result limit
pub fn page_size(limit: usize) -> usize {
    limit.clamp(PAGE_SIZE_MIN, PAGE_SIZE_MAX)
}

/// How many result pages are needed to cover `limit` items
pub fn pages_needed(limit: usize) -> usize {
    let per_page = page_size(limit);
    limit.div_ceil(per_page).max(1)
}

fn format_bound(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

/// Query-string percent-encoding; keywords are plain ASCII-ish free text so
/// only the reserved set matters here
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

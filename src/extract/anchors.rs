//! Strategy 4: loose anchor scan.
//!
//! Last-resort pass over the raw markup: any anchor pointing at an
//! item-detail URL becomes a candidate record, with the first
//! currency-prefixed number in a bounded window after the anchor as its
//! price. Accepts a higher false-positive rate so a page that clearly
//! contains listings never parses to zero.

use crate::extract::{canonical_link, is_placeholder_title, squash_whitespace};
use crate::models::ListingRecord;
use crate::price::parse_price;
use regex::Regex;
use std::sync::OnceLock;

/// How much raw HTML after each anchor is scanned for a price token
const PRICE_WINDOW: usize = 600;

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["']([^"']*/itm/[^"']+)["'][^>]*>(.*?)</a>"#)
            .unwrap()
    })
}

fn price_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[A-Z]{1,3}\s?)?[$£€]\s?[0-9][0-9,]*(?:\.[0-9]{1,2})?").unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

pub fn extract(html: &str) -> Vec<ListingRecord> {
    let mut records = Vec::new();

    for caps in anchor_re().captures_iter(html) {
        let href = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let title = squash_whitespace(&tag_re().replace_all(inner, " "));
        if is_placeholder_title(&title) {
            continue;
        }

        let link = canonical_link(href);
        if !link.starts_with("http") {
            continue;
        }

        let window_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let (price, currency) = price_in_window(html, window_start);

        records.push(ListingRecord {
            title,
            price,
            currency,
            image: None,
            link,
            sold_date: None,
        });
    }

    records
}

/// First currency-prefixed numeric token within the window after `start`
fn price_in_window(html: &str, start: usize) -> (String, Option<String>) {
    let end = (start + PRICE_WINDOW).min(html.len());
    // Clamp to char boundaries; the window is byte-indexed
    let start = ceil_char_boundary(html, start.min(html.len()));
    let end = ceil_char_boundary(html, end);
    let window = &html[start..end];

    match price_token_re().find(window) {
        Some(m) => {
            let parsed = parse_price(m.as_str());
            if parsed.amount.is_empty() {
                (String::new(), None)
            } else {
                (parsed.amount, Some(parsed.currency))
            }
        }
        None => (String::new(), None),
    }
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i.min(s.len())
}

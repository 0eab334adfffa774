//! Sold-date enrichment.
//!
//! Completed-listing tiles carry the sale date in caption text ("Sold Aug
//! 18, 2025", sometimes "Ended: ..."). This is a separate post-pass: dates
//! are collected per tile, keyed by canonical link, and attached to whatever
//! records the cascade produced. Missing dates are fine; only sold-mode
//! responses run this at all.

use crate::extract::{canonical_link, squash_whitespace};
use crate::models::ListingRecord;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

const CAPTION_SELECTORS: [&str; 3] = [
    ".s-item__caption",
    ".s-item__title--tagblock",
    ".s-item__detail .POSITIVE",
];

fn sold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bSold\s+([A-Za-z]{3,9}\s+\d{1,2},\s+\d{4})").unwrap()
    })
}

fn ended_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bEnded:\s*([A-Za-z0-9, :/-]+)").unwrap())
}

/// Attach sold dates from the page's caption text to matching records
pub fn enrich(html: &str, records: &mut [ListingRecord]) {
    let dates = dates_by_link(html);
    if dates.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        if record.sold_date.is_none() {
            if let Some(date) = dates.get(&record.link) {
                record.sold_date = Some(date.clone());
            }
        }
    }
}

/// Map of canonical listing link to the sold/ended date found in its tile
fn dates_by_link(html: &str) -> HashMap<String, String> {
    let document = Html::parse_document(html);
    let mut dates = HashMap::new();

    let container = match Selector::parse(".s-item") {
        Ok(s) => s,
        Err(_) => return dates,
    };
    let link_selector = match Selector::parse("a[href*='/itm/']") {
        Ok(s) => s,
        Err(_) => return dates,
    };

    for tile in document.select(&container) {
        let Some(href) = tile
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let mut caption_text = String::new();
        for selector_str in CAPTION_SELECTORS {
            if let Ok(selector) = Selector::parse(selector_str) {
                for node in tile.select(&selector) {
                    caption_text.push_str(&node.text().collect::<String>());
                    caption_text.push(' ');
                }
            }
        }
        // Some variants put the date straight in the tile body
        if caption_text.trim().is_empty() {
            caption_text = tile.text().collect::<String>();
        }

        if let Some(date) = date_from_text(&caption_text) {
            dates.entry(canonical_link(href)).or_insert(date);
        }
    }

    dates
}

/// Pull a date out of caption text; `Sold <Month> <Day>, <Year>` preferred,
/// `Ended: <date>` as fallback
pub(crate) fn date_from_text(text: &str) -> Option<String> {
    let text = squash_whitespace(text);
    if let Some(caps) = sold_re().captures(&text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = ended_re().captures(&text) {
        return Some(caps[1].trim().to_string());
    }
    None
}

//! Merging fetched pages into the final response.
//!
//! Each page goes through the extraction cascade on its own; results are
//! concatenated in page order, deduplicated by link (first occurrence wins),
//! run through the server-side safety price band, and truncated to the
//! requested limit. The band here is a second line of defense: upstream
//! query parameters are not always honored by the marketplace.

use crate::extract;
use crate::models::{ListingRecord, SearchMeta, SearchMode, SearchQuery, SearchResponse};
use crate::price::to_number;
use chrono::Utc;
use tracing::debug;

/// Run the cascade over every fetched page and assemble the response
pub fn assemble(pages: &[String], query: &SearchQuery) -> SearchResponse {
    let mut merged = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        let mut records = extract::extract(page);
        if query.mode == SearchMode::Sold {
            extract::sold_date::enrich(page, &mut records);
        }
        debug!(page = i + 1, count = records.len(), "page extracted");
        merged.extend(records);
    }

    let items = finalize(merged, query);
    let count = items.len();
    SearchResponse {
        items,
        meta: SearchMeta {
            count,
            upstream: Vec::new(),
            reason: None,
            last_tried: None,
            fetched_at: Utc::now(),
        },
    }
}

/// Dedup, band-filter, truncate -- shared by both listing sources
pub fn finalize(records: Vec<ListingRecord>, query: &SearchQuery) -> Vec<ListingRecord> {
    let deduped = extract::dedup_by_link(records);
    let band = query.price_band();
    deduped
        .into_iter()
        .filter(|r| passes_band(r, band))
        .take(query.limit.max(1))
        .collect()
}

/// A record passes when its price is unknown (permissive default) or falls
/// within the band; no band means everything passes
fn passes_band(record: &ListingRecord, band: Option<(f64, f64)>) -> bool {
    let Some((lo, hi)) = band else {
        return true;
    };
    match to_number(&record.price) {
        Some(price) => lo <= price && price <= hi,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link: &str, price: &str) -> ListingRecord {
        ListingRecord {
            title: format!("part {}", link),
            price: price.into(),
            currency: Some("$".into()),
            image: None,
            link: link.into(),
            sold_date: None,
        }
    }

    fn junkyard_query() -> SearchQuery {
        SearchQuery {
            junkyard: true,
            price_min: Some(100.0),
            price_max: Some(400.0),
            ..Default::default()
        }
    }

    #[test]
    fn band_filter_keeps_in_range_and_unknown_prices() {
        let records = vec![
            record("https://x/itm/1", "99.99"),
            record("https://x/itm/2", "100"),
            record("https://x/itm/3", "250.00"),
            record("https://x/itm/4", "400"),
            record("https://x/itm/5", "400.01"),
            record("https://x/itm/6", ""),
        ];
        let kept = finalize(records, &junkyard_query());
        let links: Vec<_> = kept.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://x/itm/2", "https://x/itm/3", "https://x/itm/4", "https://x/itm/6"]
        );
    }

    #[test]
    fn no_band_passes_everything() {
        let records = vec![record("https://x/itm/1", "5.00"), record("https://x/itm/2", "")];
        let kept = finalize(records, &SearchQuery::default());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn dedup_across_pages_keeps_first_and_order() {
        let mut q = SearchQuery::default();
        q.limit = 10;
        let records = vec![
            record("https://x/itm/1", "10"),
            record("https://x/itm/2", "20"),
            record("https://x/itm/1", "999"),
            record("https://x/itm/3", "30"),
        ];
        let kept = finalize(records, &q);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].price, "10");
        assert_eq!(kept[2].link, "https://x/itm/3");
    }

    #[test]
    fn truncates_to_limit() {
        let mut q = SearchQuery::default();
        q.limit = 2;
        let records = (1..=5)
            .map(|i| record(&format!("https://x/itm/{}", i), "10"))
            .collect();
        assert_eq!(finalize(records, &q).len(), 2);
    }

    #[test]
    fn assemble_merges_pages_and_counts() {
        let page1 = r#"<li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/1"></a>
            <div class="s-item__title">Strut Assembly</div>
            <span class="s-item__price">$150.00</span>
            <div class="s-item__caption">Sold Aug 18, 2025</div>
        </li>"#
            .to_string();
        let page2 = r#"<li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/2"></a>
            <div class="s-item__title">Control Arm</div>
            <span class="s-item__price">$85.00</span>
        </li>"#
            .to_string();

        let response = assemble(&[page1, page2], &SearchQuery::default());
        assert_eq!(response.meta.count, 2);
        assert_eq!(response.items[0].sold_date.as_deref(), Some("Aug 18, 2025"));
        assert_eq!(response.items[1].title, "Control Arm");
        assert!(response.meta.reason.is_none());
    }
}

//! Strategy 1: structural CSS selectors.
//!
//! The marketplace ships several listing-tile template generations at once,
//! so both the container and every field are located through prioritized
//! selector lists, first non-empty match wins. Selector strings are a
//! maintenance surface, not a contract; expect to extend these lists as the
//! upstream markup drifts.

use crate::extract::{canonical_link, is_placeholder_title, squash_whitespace};
use crate::models::ListingRecord;
use crate::price::parse_price;
use scraper::{ElementRef, Html, Selector};

/// Listing-container candidates, one template generation each
const CONTAINER_SELECTORS: [&str; 4] = [
    "li.s-item",
    "div.s-item",
    ".s-item",
    "li[data-viewport] .su-card-container",
];

const TITLE_SELECTORS: [&str; 4] = [
    ".s-item__title span",
    ".s-item__title",
    ".su-styled-text.primary",
    "h3",
];

const PRICE_SELECTORS: [&str; 3] = [
    ".s-item__price",
    ".s-item__detail--primary",
    ".su-styled-text.positive",
];

const LINK_SELECTORS: [&str; 3] = ["a.s-item__link", "a[href*='/itm/']", "a"];

const IMAGE_SELECTORS: [&str; 2] = [".s-item__image-img", "img"];

/// Promotional/non-listing tile markers; any hit rejects the container
const REJECT_MARKERS: [&str; 3] = ["sponsored", "shop on ebay", "explore related"];

pub fn extract(html: &str) -> Vec<ListingRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for selector_str in CONTAINER_SELECTORS {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for container in document.select(&selector) {
            if let Some(record) = record_from_container(&container) {
                records.push(record);
            }
        }

        // First template generation that matches wins; later, looser
        // selectors would re-match the same nodes.
        if !records.is_empty() {
            break;
        }
    }

    records
}

fn record_from_container(container: &ElementRef) -> Option<ListingRecord> {
    let tile_text = squash_whitespace(&container.text().collect::<String>()).to_lowercase();
    if REJECT_MARKERS.iter().any(|m| tile_text.contains(m)) {
        return None;
    }

    let title = first_text(container, &TITLE_SELECTORS)?;
    if is_placeholder_title(&title) {
        return None;
    }

    let link = first_attr(container, &LINK_SELECTORS, "href")?;
    let link = canonical_link(&link);
    if !link.starts_with("http") {
        return None;
    }

    // Price is optional: a record without one is still browsable, it just
    // stays out of numeric aggregation.
    let (price, currency) = match first_text(container, &PRICE_SELECTORS) {
        Some(text) => {
            let parsed = parse_price(&text);
            let currency = if parsed.amount.is_empty() {
                None
            } else {
                Some(parsed.currency)
            };
            (parsed.amount, currency)
        }
        None => (String::new(), None),
    };

    let image = first_attr(container, &IMAGE_SELECTORS, "src")
        .or_else(|| first_attr(container, &IMAGE_SELECTORS, "data-src"))
        .filter(|src| src.starts_with("http"));

    Some(ListingRecord {
        title,
        price,
        currency,
        image,
        link,
        sold_date: None,
    })
}

/// First non-empty text content among the candidate selectors
fn first_text(element: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(found) = element.select(&selector).next() {
            let text = squash_whitespace(&found.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First non-empty attribute value among the candidate selectors
fn first_attr(element: &ElementRef, selectors: &[&str], attr: &str) -> Option<String> {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        for found in element.select(&selector) {
            if let Some(value) = found.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_one_complete_record() {
        let html = r#"<ul class="srp-results">
          <li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/111111111111?hash=x">
              <div class="s-item__title"><span>Brake Caliper</span></div>
            </a>
            <span class="s-item__price">$45.00</span>
            <img class="s-item__image-img" src="https://i.ebayimg.com/thumbs/caliper.jpg">
          </li>
        </ul>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title, "Brake Caliper");
        assert_eq!(r.price, "45.00");
        assert_eq!(r.currency.as_deref(), Some("$"));
        assert_eq!(r.link, "https://www.ebay.com/itm/111111111111");
        assert_eq!(r.image.as_deref(), Some("https://i.ebayimg.com/thumbs/caliper.jpg"));
    }

    #[test]
    fn rejects_shop_on_ebay_placeholder() {
        let html = r#"<li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/1"></a>
            <div class="s-item__title">Shop on eBay</div>
            <span class="s-item__price">$20.00</span>
        </li>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn rejects_sponsored_tiles() {
        let html = r#"<li class="s-item">
            <span class="s-item__sep">Sponsored</span>
            <a class="s-item__link" href="https://www.ebay.com/itm/2"></a>
            <div class="s-item__title">Totally Real Part</div>
            <span class="s-item__price">$99.00</span>
        </li>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn keeps_record_without_price() {
        let html = r#"<li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/3"></a>
            <div class="s-item__title">Door Mirror Assembly</div>
        </li>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, "");
        assert_eq!(records[0].currency, None);
    }

    #[test]
    fn drops_container_without_link() {
        let html = r#"<li class="s-item">
            <div class="s-item__title">Orphan Tile</div>
            <span class="s-item__price">$10.00</span>
        </li>"#;
        assert!(extract(html).is_empty());
    }
}

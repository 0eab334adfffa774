//! Strategy 2: JSON-LD structured data.
//!
//! Results pages sometimes carry an `ItemList` in `application/ld+json`
//! blocks. Sites concatenate multiple JSON documents into one script tag
//! without array syntax, so blocks that fail to parse whole are re-split on
//! the `}{` boundary and each chunk parsed independently; chunks that still
//! fail are discarded.

use crate::extract::{canonical_link, is_placeholder_title};
use crate::models::ListingRecord;
use crate::price::parse_price;
use scraper::{Html, Selector};
use serde_json::Value;

pub fn extract(html: &str) -> Vec<ListingRecord> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut records = Vec::new();
    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        for doc in parse_documents(&raw) {
            collect_item_lists(&doc, &mut records);
        }
    }
    records
}

/// Parse a script body that may hold one JSON document or several
/// concatenated ones
fn parse_documents(raw: &str) -> Vec<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(doc) = serde_json::from_str::<Value>(trimmed) {
        return vec![doc];
    }

    // `}{` boundary heuristic: split and re-balance the braces we removed
    trimmed
        .split("}{")
        .enumerate()
        .filter_map(|(i, chunk)| {
            let candidate = if i == 0 {
                format!("{}}}", chunk)
            } else {
                format!("{{{}}}", chunk)
            };
            // Last chunk already ends with its own brace; try both forms
            serde_json::from_str::<Value>(&candidate)
                .or_else(|_| serde_json::from_str::<Value>(&format!("{{{}", chunk)))
                .ok()
        })
        .collect()
}

/// Recursively find `ItemList` nodes (top-level, `@graph`-wrapped, or
/// nested) and drain their elements
fn collect_item_lists(node: &Value, out: &mut Vec<ListingRecord>) {
    match node {
        Value::Object(map) => {
            let is_item_list = map
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("ItemList"));
            if is_item_list {
                if let Some(Value::Array(elements)) = map.get("itemListElement") {
                    for element in elements {
                        if let Some(record) = record_from_element(element) {
                            out.push(record);
                        }
                    }
                }
            }
            for value in map.values() {
                collect_item_lists(value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_item_lists(item, out);
            }
        }
        _ => {}
    }
}

/// One `itemListElement` entry; the payload is either the element itself or
/// nested under `item`
fn record_from_element(element: &Value) -> Option<ListingRecord> {
    let node = element.get("item").unwrap_or(element);

    let title = node
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();
    if is_placeholder_title(&title) {
        return None;
    }

    let link = node
        .get("url")
        .or_else(|| node.get("@id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;
    let link = canonical_link(link);

    let (price, currency) = price_of(node);
    let image = image_of(node);

    Some(ListingRecord {
        title,
        price,
        currency,
        image,
        link,
        sold_date: None,
    })
}

/// Price across the nested shapes sites emit: `offers.price` (+
/// `offers.priceCurrency`), `price.value`, or a flat `price`
fn price_of(node: &Value) -> (String, Option<String>) {
    let offers = match node.get("offers") {
        Some(Value::Array(arr)) => arr.first(),
        other => other,
    };

    let raw_price = offers
        .and_then(|o| o.get("price"))
        .and_then(|p| scalar_string(p).or_else(|| p.get("value").and_then(scalar_string)))
        .or_else(|| {
            node.get("price").and_then(|p| {
                scalar_string(p).or_else(|| p.get("value").and_then(scalar_string))
            })
        });

    let raw_currency = offers
        .and_then(|o| o.get("priceCurrency"))
        .or_else(|| node.get("price").and_then(|p| p.get("currency")))
        .and_then(Value::as_str)
        .map(str::to_string);

    match raw_price {
        Some(text) => {
            let parsed = parse_price(&text);
            if parsed.amount.is_empty() {
                (String::new(), None)
            } else {
                (parsed.amount, raw_currency.or(Some(parsed.currency)))
            }
        }
        None => (String::new(), None),
    }
}

fn image_of(node: &Value) -> Option<String> {
    let image = node.get("image")?;
    let url = match image {
        Value::String(s) => s.clone(),
        Value::Array(arr) => arr.first().and_then(Value::as_str)?.to_string(),
        Value::Object(map) => map.get("url").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    if url.starts_with("http") {
        Some(url)
    } else {
        None
    }
}

/// Accept strings and bare JSON numbers where a price might live
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_item_list_with_offers() {
        let html = r#"<html><head><script type="application/ld+json">
        {
          "@context": "https://schema.org",
          "@type": "ItemList",
          "itemListElement": [
            {
              "@type": "ListItem",
              "item": {
                "@type": "Product",
                "name": "OEM Radiator 2010 Accord",
                "url": "https://www.ebay.com/itm/333333333333?var=1",
                "image": "https://i.ebayimg.com/images/radiator.jpg",
                "offers": {"price": "120.00", "priceCurrency": "USD"}
              }
            }
          ]
        }
        </script></head><body></body></html>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "OEM Radiator 2010 Accord");
        assert_eq!(records[0].price, "120.00");
        assert_eq!(records[0].currency.as_deref(), Some("USD"));
        assert_eq!(records[0].link, "https://www.ebay.com/itm/333333333333");
    }

    #[test]
    fn splits_concatenated_documents() {
        let html = r#"<script type="application/ld+json">{"@type":"WebSite","name":"x"}{"@type":"ItemList","itemListElement":[{"name":"Fuel Pump","url":"https://www.ebay.com/itm/44","price":38.5}]}</script>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Fuel Pump");
        assert_eq!(records[0].price, "38.5");
    }

    #[test]
    fn numeric_price_value_shape() {
        let html = r#"<script type="application/ld+json">
        {"@type":"ItemList","itemListElement":[
          {"name":"Tail Light","url":"https://www.ebay.com/itm/55",
           "price":{"value":"62.00","currency":"GBP"}}
        ]}
        </script>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, "62.00");
        assert_eq!(records[0].currency.as_deref(), Some("GBP"));
    }

    #[test]
    fn skips_elements_missing_name_or_url() {
        let html = r#"<script type="application/ld+json">
        {"@type":"ItemList","itemListElement":[
          {"url":"https://www.ebay.com/itm/66","price":"10"},
          {"name":"No Link","price":"10"}
        ]}
        </script>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn unparsable_blocks_are_discarded() {
        let html = r#"<script type="application/ld+json">{not json at all</script>"#;
        assert!(extract(html).is_empty());
    }
}

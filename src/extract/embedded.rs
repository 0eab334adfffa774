//! Strategy 3: embedded bootstrap JSON.
//!
//! JS-hydrated page variants ship their listings inside a global data blob
//! rather than in the markup. The blob is located by a marker string, bounded
//! by a string-aware brace-depth scan (the payload nests arbitrarily, so a
//! regex cannot bound it), parsed with serde_json, and then walked
//! recursively testing every object for a listing shape. The state shape is
//! undocumented and drifts; the markers and price shapes below are a
//! maintenance surface.

use crate::extract::{canonical_link, is_placeholder_title};
use crate::models::ListingRecord;
use crate::price::parse_price;
use serde_json::Value;

/// Global-data markers observed across page variants, tried in order
const BLOB_MARKERS: [&str; 3] = [
    "__EBAY_GLOBAL_DATA__",
    "window.__APP_STATE__",
    "\"GLOBAL_PROVIDER\"",
];

pub fn extract(html: &str) -> Vec<ListingRecord> {
    for marker in BLOB_MARKERS {
        let Some(marker_pos) = html.find(marker) else {
            continue;
        };
        let after = &html[marker_pos + marker.len()..];
        let Some(blob) = bounded_json_object(after) else {
            continue;
        };
        let Ok(root) = serde_json::from_str::<Value>(blob) else {
            continue;
        };

        let mut records = Vec::new();
        visit(&root, &mut records);
        if !records.is_empty() {
            return records;
        }
    }
    Vec::new()
}

/// Slice out the JSON object starting at the first `{` in `text`, using a
/// linear brace-depth scan that skips string literals and escapes
pub(crate) fn bounded_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn visit(node: &Value, out: &mut Vec<ListingRecord>) {
    match node {
        Value::Object(map) => {
            if let Some(record) = candidate_listing(node) {
                out.push(record);
            }
            for value in map.values() {
                visit(value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, out);
            }
        }
        _ => {}
    }
}

/// Recognized price shapes inside the blob, attempted in order
#[derive(Debug)]
enum PriceShape {
    /// `"price": "US $45.00"` or `"price": 45.0`
    Flat(String),
    /// `"price": {"value": "45.00", "currency": "USD"}`
    ValueCurrency { value: String, currency: Option<String> },
    /// `"marketingPrice": {"price": <either of the above>}`
    NestedMarketingPrice(Box<PriceShape>),
}

impl PriceShape {
    fn detect(node: &Value) -> Option<PriceShape> {
        if let Some(price) = node.get("price") {
            if let Some(flat) = scalar_string(price) {
                return Some(PriceShape::Flat(flat));
            }
            if let Some(value) = price.get("value").and_then(scalar_string) {
                let currency = price
                    .get("currency")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                return Some(PriceShape::ValueCurrency { value, currency });
            }
        }
        if let Some(marketing) = node.get("marketingPrice") {
            if let Some(inner) = PriceShape::detect(marketing) {
                return Some(PriceShape::NestedMarketingPrice(Box::new(inner)));
            }
        }
        None
    }

    /// Normalize to `(amount, currency)`
    fn resolve(&self) -> (String, Option<String>) {
        match self {
            PriceShape::Flat(text) => {
                let parsed = parse_price(text);
                if parsed.amount.is_empty() {
                    (String::new(), None)
                } else {
                    (parsed.amount, Some(parsed.currency))
                }
            }
            PriceShape::ValueCurrency { value, currency } => {
                let parsed = parse_price(value);
                if parsed.amount.is_empty() {
                    (String::new(), None)
                } else {
                    (parsed.amount, currency.clone().or(Some(parsed.currency)))
                }
            }
            PriceShape::NestedMarketingPrice(inner) => inner.resolve(),
        }
    }
}

/// Heuristic listing test: a node qualifies when it carries a title, an
/// item URL, and a price in one of the recognized shapes
fn candidate_listing(node: &Value) -> Option<ListingRecord> {
    let title = node
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();
    if is_placeholder_title(&title) {
        return None;
    }

    let link = node
        .get("url")
        .or_else(|| node.get("itemUrl"))
        .and_then(Value::as_str)
        .filter(|s| s.contains("/itm/"))?;
    let link = canonical_link(link);

    let shape = PriceShape::detect(node)?;
    let (price, currency) = shape.resolve();

    let image = node
        .get("image")
        .and_then(|img| match img {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|url| url.starts_with("http"));

    Some(ListingRecord {
        title,
        price,
        currency,
        image,
        link,
        sold_date: None,
    })
}

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
    fn brace_scan_handles_nesting_and_strings() {
        let text = r#"junk = {"a": {"b": [1, 2, {"c": "}"}]}, "d": "\"{"} ; trailing"#;
        let blob = bounded_json_object(text).unwrap();
        assert_eq!(blob, r#"{"a": {"b": [1, 2, {"c": "}"}]}, "d": "\"{"}"#);
        serde_json::from_str::<Value>(blob).unwrap();
    }

    #[test]
    fn brace_scan_rejects_unterminated_blob() {
        assert!(bounded_json_object(r#"{"open": {"never": 1}"#).is_none());
        assert!(bounded_json_object("no braces here").is_none());
    }

    #[test]
    fn extracts_flat_price_listing_from_blob() {
        let html = r#"<script>window.__EBAY_GLOBAL_DATA__ = {
            "modules": {"cards": [
                {"title": "Turbocharger Assembly",
                 "url": "https://www.ebay.com/itm/777777777777?campid=x",
                 "price": "US $350.00"}
            ]}
        };</script>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Turbocharger Assembly");
        assert_eq!(records[0].price, "350.00");
        assert_eq!(records[0].currency.as_deref(), Some("US"));
        assert_eq!(records[0].link, "https://www.ebay.com/itm/777777777777");
    }

    #[test]
    fn extracts_value_currency_and_marketing_price_shapes() {
        let html = r#"window.__APP_STATE__ = {"results": [
            {"title": "ECU Module", "url": "/itm/1212",
             "price": {"value": "89.95", "currency": "USD"}},
            {"title": "Shifter Knob", "itemUrl": "https://www.ebay.com/itm/3434",
             "marketingPrice": {"price": {"value": 15, "currency": "EUR"}}}
        ]};"#;
        let records = extract(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].price, "89.95");
        assert_eq!(records[0].currency.as_deref(), Some("USD"));
        assert_eq!(records[0].link, "https://www.ebay.com/itm/1212");
        assert_eq!(records[1].price, "15");
        assert_eq!(records[1].currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn nodes_without_item_url_are_ignored() {
        let html = r#"__EBAY_GLOBAL_DATA__ = {"title": "Not a listing",
            "url": "https://www.ebay.com/help", "price": "5.00"}"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn no_marker_means_no_records() {
        assert!(extract(r#"{"title":"x","url":"/itm/1","price":"1"}"#).is_empty());
    }
}

//! End-to-end extraction and assembly over realistic page fixtures.

use parts_scout::models::{SearchMode, SearchQuery};
use parts_scout::{assemble, extract};

/// A small results page in the classic tile markup: two real listings, one
/// sponsored tile, one placeholder tile, one duplicate of the first listing.
const TILE_PAGE: &str = r#"
<html><body>
<ul class="srp-results srp-list">
  <li class="s-item">
    <a class="s-item__link" href="https://www.ebay.com/itm/111111111111?hash=item19e">
      <div class="s-item__title"><span>2008 Honda Civic Brake Caliper Front Left OEM</span></div>
    </a>
    <span class="s-item__price">$45.00</span>
    <img class="s-item__image-img" src="https://i.ebayimg.com/thumbs/images/caliper.jpg">
    <div class="s-item__caption"><span>Sold Aug 18, 2025</span></div>
  </li>
  <li class="s-item">
    <span class="s-item__sep">Sponsored</span>
    <a class="s-item__link" href="https://www.ebay.com/itm/999999999999"></a>
    <div class="s-item__title">Promoted Part You Did Not Ask For</div>
    <span class="s-item__price">$500.00</span>
  </li>
  <li class="s-item">
    <a class="s-item__link" href="https://www.ebay.com/itm/000000000000"></a>
    <div class="s-item__title">Shop on eBay</div>
    <span class="s-item__price">$20.00</span>
  </li>
  <li class="s-item">
    <a class="s-item__link" href="https://www.ebay.com/itm/222222222222">
      <div class="s-item__title"><span>Civic Brake Rotor Pair Used</span></div>
    </a>
    <span class="s-item__price">US $1,299.50</span>
    <div class="s-item__caption"><span>Sold Jul 2, 2025</span></div>
  </li>
  <li class="s-item">
    <a class="s-item__link" href="https://www.ebay.com/itm/111111111111?var=different-campaign">
      <div class="s-item__title"><span>Duplicate of the caliper via another campaign link</span></div>
    </a>
    <span class="s-item__price">$47.00</span>
  </li>
</ul>
</body></html>
"#;

#[test]
fn tile_page_extracts_real_listings_only() {
    let records = extract::extract(TILE_PAGE);
    let links: Vec<_> = records.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://www.ebay.com/itm/111111111111",
            "https://www.ebay.com/itm/222222222222",
        ]
    );
    assert_eq!(records[0].title, "2008 Honda Civic Brake Caliper Front Left OEM");
    assert_eq!(records[0].price, "45.00");
    assert_eq!(records[0].currency.as_deref(), Some("$"));
    assert_eq!(records[1].price, "1299.50");
    assert_eq!(records[1].currency.as_deref(), Some("US"));
}

#[test]
fn extraction_is_idempotent() {
    assert_eq!(extract::extract(TILE_PAGE), extract::extract(TILE_PAGE));
}

#[test]
fn sold_mode_assembly_attaches_dates() {
    let query = SearchQuery {
        mode: SearchMode::Sold,
        ..Default::default()
    };
    let response = assemble::assemble(&[TILE_PAGE.to_string()], &query);
    assert_eq!(response.meta.count, 2);
    assert_eq!(response.items[0].sold_date.as_deref(), Some("Aug 18, 2025"));
    assert_eq!(response.items[1].sold_date.as_deref(), Some("Jul 2, 2025"));
}

#[test]
fn active_mode_assembly_skips_date_enrichment() {
    let query = SearchQuery {
        mode: SearchMode::Active,
        ..Default::default()
    };
    let response = assemble::assemble(&[TILE_PAGE.to_string()], &query);
    assert!(response.items.iter().all(|r| r.sold_date.is_none()));
}

#[test]
fn json_ld_page_falls_through_to_strategy_two() {
    let page = r#"<html><head>
    <script type="application/ld+json">
    {"@context":"https://schema.org","@type":"ItemList","itemListElement":[
      {"@type":"ListItem","item":{"name":"Transmission Mount","url":"https://www.ebay.com/itm/123",
       "offers":{"price":"34.99","priceCurrency":"USD"}}}
    ]}
    </script>
    </head><body><p>hydrating...</p></body></html>"#;
    let records = extract::extract(page);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Transmission Mount");
    assert_eq!(records[0].currency.as_deref(), Some("USD"));
}

#[test]
fn bootstrap_blob_page_falls_through_to_strategy_three() {
    let page = r#"<html><body><script>
    window.__EBAY_GLOBAL_DATA__ = {"srp":{"river":[
      {"listing":{"title":"Valve Cover Gasket Set","url":"https://www.ebay.com/itm/456?x=1",
       "marketingPrice":{"price":{"value":"22.50","currency":"USD"}}}}
    ]}};
    </script></body></html>"#;
    let records = extract::extract(page);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price, "22.50");
    assert_eq!(records[0].link, "https://www.ebay.com/itm/456");
}

#[test]
fn anchor_scan_is_the_last_resort() {
    let page = r#"<html><body>
    <div class="totally-new-template">
      <a href="https://www.ebay.com/itm/333444555">Exhaust Manifold 04-08 F-150</a>
      <em>US $89.00</em>
    </div>
    </body></html>"#;
    let records = extract::extract(page);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Exhaust Manifold 04-08 F-150");
    assert_eq!(records[0].price, "89.00");
}

#[test]
fn response_serialization_matches_wire_shape() {
    let query = SearchQuery::default();
    let response = assemble::assemble(&[TILE_PAGE.to_string()], &query);
    let json = serde_json::to_value(&response).unwrap();

    // Success: no reason key at all
    assert!(json["meta"].get("reason").is_none());
    assert_eq!(json["meta"]["count"], 2);
    // Sold date rides as camelCase like the original wire format
    assert_eq!(json["items"][0]["soldDate"], "Aug 18, 2025");
}

#[test]
fn junkyard_band_is_enforced_server_side() {
    let query = SearchQuery {
        junkyard: true,
        ..Default::default()
    };
    let response = assemble::assemble(&[TILE_PAGE.to_string()], &query);
    // $45.00 and $1,299.50 both fall outside the default 100-400 band
    assert!(response.items.is_empty());
}

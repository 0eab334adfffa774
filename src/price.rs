//! Free-text price normalization.
//!
//! Marketplace price strings arrive in many shapes ("$45.00", "US $1,299.50",
//! "£12.99 to £24.99", "Free"). Every other component funnels price text
//! through here so "unknown" is represented one way: an empty amount, never
//! a zero.

use regex::Regex;
use std::sync::OnceLock;

/// Normalized price: numeric string plus a best-effort currency marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrice {
    /// Digits and decimal point only; "" when no numeric run was found
    pub amount: String,
    /// Letter code ("US", "GBP") or symbol; "$" when a number exists but no
    /// marker was present; "" when the amount is empty
    pub currency: String,
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Optional 1-3 letter currency prefix, optional symbol, then the number.
    // Commas are stripped before matching so "1,299.50" reads as one run.
    RE.get_or_init(|| {
        Regex::new(r"(?:([A-Za-z]{1,3})\s*)?([$£€])?\s*([0-9]+(?:\.[0-9]+)?)").unwrap()
    })
}

/// Parse a free-text price into `{amount, currency}`.
///
/// No numeric run means `amount == ""` -- callers must treat that as
/// "unknown", never coerce it to zero in aggregate math.
pub fn parse_price(text: &str) -> ParsedPrice {
    let cleaned = text.replace(',', "");
    let caps = match price_re().captures(&cleaned) {
        Some(caps) => caps,
        None => {
            return ParsedPrice {
                amount: String::new(),
                currency: String::new(),
            }
        }
    };

    let amount = caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
    let letters = caps.get(1).map(|m| m.as_str().to_string());
    let symbol = caps.get(2).map(|m| m.as_str().to_string());

    // Letter prefix wins over symbol: "US $1299.50" reports "US"
    let currency = letters
        .or(symbol)
        .unwrap_or_else(|| "$".to_string());

    ParsedPrice { amount, currency }
}

/// Re-derive a float from already-normalized price text for filtering and
/// sorting. `None` (not NaN, not 0) when unparsable; unknown prices must
/// pass price-band filters rather than fail closed.
pub fn to_number(price_text: &str) -> Option<f64> {
    let parsed = parse_price(price_text);
    if parsed.amount.is_empty() {
        return None;
    }
    parsed.amount.parse::<f64>().ok()
}

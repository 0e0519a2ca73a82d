//! Vintage and price extraction from raw wine list lines.
//!
//! Extraction never fails: anything that cannot be read is reported as absent.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::matching::ParsedQuery;
use crate::services::normalizer::normalize;

static FULL_YEAR_REGEX: OnceLock<Regex> = OnceLock::new();
static SHORT_YEAR_REGEX: OnceLock<Regex> = OnceLock::new();
static PRICE_REGEX: OnceLock<Regex> = OnceLock::new();

fn full_year_regex() -> &'static Regex {
    FULL_YEAR_REGEX.get_or_init(|| {
        Regex::new(r"\b(19[5-9]\d|20[0-3]\d)\b").expect("valid vintage regex")
    })
}

fn short_year_regex() -> &'static Regex {
    SHORT_YEAR_REGEX.get_or_init(|| {
        Regex::new(r"['\u{2018}\u{2019}](\d{2})\b").expect("valid short vintage regex")
    })
}

fn price_regex() -> &'static Regex {
    PRICE_REGEX.get_or_init(|| {
        Regex::new(r"\$([\d,]+(?:\.\d{2})?)").expect("valid price regex")
    })
}

/// First vintage year in the text.
///
/// Four-digit years in 1950..=2039 win; otherwise an apostrophe year such as
/// `'98` maps to 1998 and `'05` to 2005.
pub fn extract_vintage(text: &str) -> Option<i32> {
    if let Some(caps) = full_year_regex().captures(text) {
        return caps[1].parse().ok();
    }

    let caps = short_year_regex().captures(text)?;
    let short: i32 = caps[1].parse().ok()?;
    Some(if short >= 50 { 1900 + short } else { 2000 + short })
}

/// First dollar amount in the text, commas ignored.
pub fn extract_price(text: &str) -> Option<f64> {
    let caps = price_regex().captures(text)?;
    let amount = caps[1].replace(',', "");
    amount.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Text with the first price fragment deleted and surrounding whitespace trimmed.
pub fn remove_price_span(text: &str) -> String {
    price_regex().replace(text, "").trim().to_string()
}

/// Reduce a raw line to normalized text plus extracted fields.
pub fn parse_query(raw: &str) -> ParsedQuery {
    ParsedQuery {
        raw: raw.to_string(),
        normalized: normalize(&remove_price_span(raw)),
        vintage: extract_vintage(raw),
        price: extract_price(raw),
    }
}

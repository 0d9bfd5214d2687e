//! Text and price canonicalization, plus the `RawRecord` → `Record` step.
//!
//! Extraction hands over text exactly as it sits in the markup; everything
//! that cleans it lives here so the two stages can be tested apart.

use std::str::FromStr;
use std::sync::LazyLock;

use pharmacrawl_core::Record;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::RawRecord;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d.,]*").expect("valid number regex"));

/// Currency markers the storefronts print next to prices.
const CURRENCY_MARKERS: [&str; 4] = ["₾", "ლარი", "ლ", "GEL"];

/// Collapses every whitespace run (including non-breaking spaces) to a single
/// space and trims both ends.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes a price to a fixed two-decimal string.
///
/// A comma is read as the decimal separator when it is the last separator
/// and exactly two digits follow it (`"15,90"`, `"1.234,50"`); otherwise
/// commas are thousands separators (`"1,234.50"`, `"1,234"`). Input with no
/// parsable number yields `""`.
#[must_use]
pub fn normalize_price(raw: &str) -> String {
    let mut cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }

    let Some(found) = NUMBER_RE.find(&cleaned) else {
        return String::new();
    };
    let number = found.as_str().trim_end_matches(['.', ',']);

    let canonical = match (number.rfind(','), number.rfind('.')) {
        (Some(comma), dot) if dot.is_none_or(|d| d < comma) && is_cents(&number[comma + 1..]) => {
            let (whole, cents) = number.split_at(comma);
            format!("{}.{}", whole.replace(['.', ','], ""), &cents[1..])
        }
        _ => number.replace(',', ""),
    };

    match Decimal::from_str(&canonical) {
        Ok(value) => {
            let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.2}")
        }
        Err(_) => String::new(),
    }
}

fn is_cents(tail: &str) -> bool {
    tail.len() == 2 && tail.bytes().all(|b| b.is_ascii_digit())
}

/// Converts an extracted record into its canonical form.
///
/// Returns `None` when the title is empty after normalization: a record
/// without a title is never emitted.
#[must_use]
pub fn normalize_record(raw: RawRecord) -> Option<Record> {
    let title = normalize_text(&raw.title);
    if title.is_empty() {
        return None;
    }

    Some(Record {
        product_code: normalize_text(&raw.product_code),
        title,
        price: normalize_price(&raw.price_text),
        price_old: normalize_price(&raw.price_old_text),
        category: raw.category,
        page_number: raw.page_number,
        source: raw.source_site,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;

//! Final garbage filter.
//!
//! OCR noise survives every parser eventually: remit-to address fragments,
//! order-summary figures, totals rows captured as items. This is the last
//! gate before emission; anything it rejects never reaches the caller.

use tracing::debug;

use crate::models::invoice::{Cents, LineItem};
use crate::rules::patterns::{CITY_TOKENS, STATE_ZIP, STREET_NUMBER, STREET_SUFFIX};

// Absurd price ceiling for a single row: $20,000.
const MAX_LINE_TOTAL: Cents = 2_000_000;

const BANNED_PHRASES: &[&str] = &[
    "ORDER SUMMARY",
    "MISC CHARGES",
    "FUEL SURCHARGE",
    "CHGS FOR",
    "ALLOWANCE FOR",
    "DROP SIZE",
];

const NON_PRODUCT_WORDS: &[&str] = &["INVOICE", "PAYMENT", "BALANCE", "AMOUNT", "DUE", "REMIT"];

/// The reason a row must be rejected, or `None` when it is a real item.
pub fn garbage_reason(
    item: &LineItem,
    invoice_total: Option<Cents>,
    singleton: bool,
) -> Option<&'static str> {
    let description = item.description.trim();
    let upper = description.to_uppercase();

    if description.is_empty() || description == "$" || description.len() <= 2 {
        return Some("degenerate description");
    }
    if item.line_total_cents > MAX_LINE_TOTAL {
        return Some("absurd line total");
    }
    if BANNED_PHRASES.iter().any(|p| upper.contains(p)) {
        return Some("order-summary phrase");
    }
    if upper.split_whitespace().any(|w| w == "TAX") {
        return Some("standalone tax word");
    }
    if (upper.contains("TOTAL") || upper.contains("SUBTOTAL")) && !upper.contains("TOTAL CASE") {
        return Some("totals label in description");
    }
    if looks_like_address(&upper) {
        return Some("address line");
    }
    if singleton
        && invoice_total.is_some_and(|total| item.line_total_cents == total)
        && !looks_like_product(&upper)
    {
        return Some("singleton echoing the invoice total");
    }
    None
}

fn looks_like_address(upper: &str) -> bool {
    if STATE_ZIP.is_match(upper) {
        return true;
    }
    if CITY_TOKENS.iter().any(|city| upper.contains(city)) {
        return true;
    }
    STREET_NUMBER.is_match(upper) && STREET_SUFFIX.is_match(upper)
}

fn looks_like_product(upper: &str) -> bool {
    if NON_PRODUCT_WORDS.iter().any(|w| upper.contains(w)) {
        return false;
    }
    upper
        .split_whitespace()
        .filter(|w| w.len() >= 3 && w.chars().all(|c| c.is_ascii_alphabetic()))
        .count()
        >= 1
}

/// Filter a final item list, renumbering survivors and reporting what was
/// dropped.
pub fn filter_items(
    items: Vec<LineItem>,
    invoice_total: Option<Cents>,
) -> (Vec<LineItem>, Vec<String>) {
    let singleton = items.len() == 1;
    let mut kept = Vec::with_capacity(items.len());
    let mut removed = Vec::new();

    for item in items {
        match garbage_reason(&item, invoice_total, singleton) {
            Some(reason) => {
                debug!(description = %item.description, reason, "filtered item");
                removed.push(format!("{} ({reason})", item.description));
            }
            None => kept.push(item),
        }
    }

    for (index, item) in kept.iter_mut().enumerate() {
        item.line_number = index as u32 + 1;
    }
    (kept, removed)
}

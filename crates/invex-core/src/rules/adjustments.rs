//! Fee and credit extraction.
//!
//! Surcharges and discounts are signed monetary events outside the item
//! list: fees positive, credits negative. Labels come from a fixed
//! vocabulary; values tolerate `$`, commas, and the same label/value
//! layouts the totals extractor handles.

use tracing::debug;

use crate::models::invoice::{Adjustment, AdjustmentKind, Cents};
use crate::rules::parse_money_cents;
use crate::rules::patterns::{CREDIT_LABEL, FEE_LABEL, MONEY_TOKEN, VALUE_ONLY_LINE};
use crate::text::InvoiceText;

// A label and its value must sit within this many lines of each other.
const VALUE_WINDOW: usize = 3;

/// Extract every fee and credit in the document.
pub fn extract_adjustments(text: &InvoiceText) -> Vec<Adjustment> {
    let lines: Vec<String> = (0..text.lines.len()).map(|i| text.squashed(i)).collect();
    let mut adjustments = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if let Some(m) = FEE_LABEL.find(line) {
            if let Some(amount) = adjustment_value(&lines, index, m.end()) {
                adjustments.push(make_adjustment(
                    AdjustmentKind::Fee,
                    m.as_str(),
                    amount.abs(),
                    line,
                ));
                continue;
            }
        }
        if let Some(m) = CREDIT_LABEL.find(line) {
            if let Some(amount) = adjustment_value(&lines, index, m.end()) {
                adjustments.push(make_adjustment(
                    AdjustmentKind::Credit,
                    m.as_str(),
                    -amount.abs(),
                    line,
                ));
            }
        }
    }

    debug!(count = adjustments.len(), "extracted adjustments");
    adjustments
}

fn make_adjustment(kind: AdjustmentKind, label: &str, amount_cents: Cents, raw: &str) -> Adjustment {
    Adjustment {
        adjustment_number: 0,
        kind,
        description: normalize_label(label),
        amount_cents,
        raw: raw.to_string(),
        is_synthetic: false,
    }
}

/// Title-case a vocabulary label for the envelope.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The value for a label: first a money token on the same line after the
/// label, else a value-only line within the window below.
fn adjustment_value(lines: &[String], index: usize, label_end: usize) -> Option<Cents> {
    let rest = &lines[index][label_end..];
    if let Some(m) = MONEY_TOKEN.find(rest) {
        // A leading minus sign in the source marks credits explicitly.
        let negative = rest[..m.start()].trim_end().ends_with('-')
            || rest[m.end()..].trim_start().starts_with("CR");
        let value = parse_money_cents(m.as_str())?;
        return Some(if negative { -value } else { value });
    }

    for line in lines.iter().skip(index + 1).take(VALUE_WINDOW) {
        if line.trim().is_empty() {
            continue;
        }
        let caps = VALUE_ONLY_LINE.captures(line)?;
        return parse_money_cents(caps.get(1).unwrap().as_str());
    }
    None
}

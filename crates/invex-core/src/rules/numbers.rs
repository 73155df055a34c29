//! Numeric-token classification and line-item math repair.
//!
//! Every numeric literal on a line is classified as a price, SKU, quantity,
//! pack size or unknown, with a confidence score and the positional evidence
//! that produced it. The same module owns the quantity-repair pass: a row
//! whose arithmetic does not close is retried with the quantity implied by
//! `line_total / unit_price`.

use crate::models::invoice::{Cents, LineItem};
use crate::rules::patterns::{is_unit_token, NUMERIC_LITERAL, PACK_SIZE};

/// Classified kind of a numeric token. Closed set; extractors must handle
/// every arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Price,
    Sku,
    Quantity,
    PackSize,
    Unknown,
}

impl NumberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberKind::Price => "price",
            NumberKind::Sku => "sku",
            NumberKind::Quantity => "quantity",
            NumberKind::PackSize => "pack-size",
            NumberKind::Unknown => "unknown",
        }
    }
}

/// One numeric literal found in a line, with positional context.
#[derive(Debug, Clone)]
pub struct NumericToken {
    /// Parsed numeric value.
    pub value: f64,

    /// The literal as printed.
    pub raw: String,

    /// Line the token came from.
    pub line_index: usize,

    /// Byte offsets within the line.
    pub start: usize,
    pub end: usize,

    /// Start offset divided by line length (0.0 left .. 1.0 right).
    pub relative_position: f32,

    /// Classified kind.
    pub kind: NumberKind,

    /// Classification confidence (0-100).
    pub confidence: u8,

    /// Evidence behind the classification.
    pub reasons: Vec<String>,
}

/// Tolerance for row arithmetic: the greater of five cents and one percent
/// of the line total.
pub fn math_tolerance(line_total_cents: Cents) -> Cents {
    5.max(line_total_cents.abs() / 100)
}

/// Extract and classify every numeric literal in a line.
pub fn classify_line(line: &str, line_index: usize) -> Vec<NumericToken> {
    let len = line.chars().count().max(1) as f32;
    let mut tokens = Vec::new();

    for m in NUMERIC_LITERAL.find_iter(line) {
        let raw = m.as_str();
        let relative_position = m.start() as f32 / len;
        let mut token = NumericToken {
            value: numeric_value(raw),
            raw: raw.to_string(),
            line_index,
            start: m.start(),
            end: m.end(),
            relative_position,
            kind: NumberKind::Unknown,
            confidence: 20,
            reasons: Vec::new(),
        };
        classify_token(&mut token, line);
        tokens.push(token);
    }

    tokens
}

fn numeric_value(raw: &str) -> f64 {
    raw.trim_start_matches('$')
        .replace(',', "")
        .parse()
        .unwrap_or(0.0)
}

fn classify_token(token: &mut NumericToken, line: &str) {
    let raw = token.raw.trim_start_matches('$');
    let has_currency = token.raw.starts_with('$');
    let decimals = raw.rsplit_once('.').map(|(_, f)| f.len());
    let digits_only = raw.replace(',', "");
    let integer_digits = decimals.is_none().then(|| digits_only.len());

    // Price: exactly two fractional digits, right half of the line.
    if decimals == Some(2) {
        let mut confidence: i32 = 60;
        token.reasons.push("two-decimal fraction".to_string());
        if has_currency {
            confidence += 10;
            token.reasons.push("currency symbol".to_string());
        }
        if token.relative_position >= 0.5 {
            confidence += 20;
            token.reasons.push("right half of line".to_string());
        }
        if (0.01..=99_999.99).contains(&token.value) {
            confidence += 15;
            token.reasons.push("plausible price range".to_string());
        }
        token.kind = NumberKind::Price;
        token.confidence = confidence.clamp(0, 100) as u8;
        return;
    }

    // Pack size: whole integer followed by a weight/volume unit.
    if decimals.is_none() && followed_by_pack_unit(token, line) {
        token.kind = NumberKind::PackSize;
        token.confidence = 70;
        token.reasons.push("weight/volume unit follows".to_string());
        return;
    }

    // SKU: 5-12 digit whole integer, preferred mid-line.
    if let Some(digits) = integer_digits {
        if (5..=12).contains(&digits) {
            let mut confidence: i32 = 55;
            token.reasons.push(format!("{digits}-digit integer"));
            if (0.2..=0.8).contains(&token.relative_position) {
                confidence += 15;
                token.reasons.push("middle of line".to_string());
            }
            if token.value > 10_000.0 {
                confidence += 10;
                token.reasons.push("too large for a quantity".to_string());
            }
            token.kind = NumberKind::Sku;
            token.confidence = confidence.clamp(0, 100) as u8;
            return;
        }

        // Quantity: whole integer 1-999, preferred left third.
        if (1.0..=999.0).contains(&token.value) {
            let mut confidence: i32 = 50;
            token.reasons.push("integer in quantity range".to_string());
            if token.relative_position <= 0.34 {
                confidence += 20;
                token.reasons.push("left third of line".to_string());
            }
            if unit_token_nearby(token, line) {
                confidence += 20;
                token.reasons.push("unit token adjacent".to_string());
            }
            token.kind = NumberKind::Quantity;
            token.confidence = confidence.clamp(0, 100) as u8;
            return;
        }
    }

    token.reasons.push("no rule matched".to_string());
}

fn followed_by_pack_unit(token: &NumericToken, line: &str) -> bool {
    PACK_SIZE
        .find_iter(line)
        .chain(crate::rules::patterns::WEIGHT_VOLUME.find_iter(line))
        .any(|m| m.start() <= token.start && token.end <= m.end())
}

fn unit_token_nearby(token: &NumericToken, line: &str) -> bool {
    let after = &line[token.end..];
    after
        .split_whitespace()
        .next()
        .is_some_and(|word| is_unit_token(word.trim_matches(|c: char| !c.is_ascii_alphanumeric())))
}

/// Whether a row's arithmetic closes within tolerance.
pub fn validate_item_math(item: &LineItem) -> bool {
    let computed = item.unit_price.extend(item.quantity);
    (computed - item.line_total_cents).abs() <= math_tolerance(item.line_total_cents)
}

/// Validate a row and, on mismatch, try the quantity implied by
/// `line_total / unit_price`. Rows that still do not close are flagged but
/// retained.
pub fn validate_and_repair(item: &mut LineItem) {
    if validate_item_math(item) {
        item.math_validated = true;
        return;
    }

    if item.unit_price_cents > 0 {
        let implied = (item.line_total_cents as f64 / (item.unit_price.dollars * 100.0)).round() as i64;
        if (1..=999).contains(&implied) {
            let closed = (item.unit_price.extend(implied) - item.line_total_cents).abs()
                <= math_tolerance(item.line_total_cents);
            if closed && implied != item.quantity {
                item.original_qty = Some(item.quantity);
                item.quantity = implied;
                item.math_corrected = true;
                item.math_validated = true;
                return;
            }
        }
    }

    item.math_validated = false;
}

//! Rule-based extraction over normalized invoice text.
//!
//! Each submodule owns one concern: named regex rules, numeric-token
//! classification, table layout detection, totals extraction, adjustment
//! vocabulary, and header fields.

pub mod adjustments;
pub mod header;
pub mod layout;
pub mod numbers;
pub mod patterns;
pub mod totals;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::invoice::{Cents, UnitPrice};

/// Parse a printed money string (`$1,998.14`, `1 998.14`, `1998.14`) into
/// integer cents. Spaces inside digit groups cover OCR-dropped thousands
/// separators. Returns `None` for anything without a two-decimal fraction.
pub fn parse_money_cents(s: &str) -> Option<Cents> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let (int_part, frac_part) = cleaned.rsplit_once('.')?;
    if frac_part.len() != 2 || int_part.contains('.') {
        return None;
    }
    let amount = Decimal::from_str(&format!("{int_part}.{frac_part}")).ok()?;
    (amount * Decimal::from(100)).round().to_i64()
}

/// Parse a unit price, tolerating the three-decimal per-case prices some
/// layouts print.
pub fn parse_price(s: &str) -> Option<UnitPrice> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let (_, frac) = cleaned.rsplit_once('.')?;
    if !(2..=3).contains(&frac.len()) {
        return None;
    }
    let dollars: f64 = cleaned.parse().ok()?;
    Some(UnitPrice::from_dollars(dollars))
}

/// Format integer cents as a dollar string for messages and traces.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_money_cents() {
        assert_eq!(parse_money_cents("$1,998.14"), Some(199_814));
        assert_eq!(parse_money_cents("1998.14"), Some(199_814));
        assert_eq!(parse_money_cents("1 998.14"), Some(199_814));
        assert_eq!(parse_money_cents("0.01"), Some(1));
        assert_eq!(parse_money_cents("130.72"), Some(13_072));
    }

    #[test]
    fn test_parse_money_rejects_non_money() {
        assert_eq!(parse_money_cents("1998"), None);
        assert_eq!(parse_money_cents("12.3"), None);
        assert_eq!(parse_money_cents("12.345"), None);
        assert_eq!(parse_money_cents(""), None);
    }

    #[test]
    fn test_parse_price_three_decimals() {
        let price = parse_price("12.375").unwrap();
        assert_eq!(price.cents, 1238);
        assert_eq!(price.extend(24), 29700);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(199_814), "$1998.14");
        assert_eq!(format_cents(-500), "-$5.00");
        assert_eq!(format_cents(7), "$0.07");
    }
}

//! Delimiter-based parser.
//!
//! Splits rows on tabs, pipes, or runs of three or more spaces and
//! classifies the parts into quantity, SKU, description and prices.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::invoice::{LineItem, UnitPrice, VendorKey};
use crate::rules::parse_money_cents;
use crate::rules::patterns::MONEY_TOKEN;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, ParseCandidate,
    ParseContext, ParseStrategy,
};

lazy_static! {
    static ref DELIMITER: Regex = Regex::new(r"\t|\||\s{3,}").unwrap();
}

pub struct DelimitedParser;

impl ParseStrategy for DelimitedParser {
    fn name(&self) -> &'static str {
        "delimited"
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();

        // Raw lines keep the wide spacing the delimiter rule needs.
        for (index, line) in ctx.text.lines.iter().enumerate() {
            if line.trim().is_empty() || is_summary_line(line) {
                continue;
            }
            let parts: Vec<&str> = DELIMITER
                .split(line.trim())
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                continue;
            }
            let Some(item) = classify_parts(&parts, index) else {
                continue;
            };
            items.push(item);
        }

        let items = finalize_items(items, "delimited");
        debug!(items = items.len(), "delimited parser");

        build_candidate("delimited", VendorKey::Generic, items, ctx, &[])
    }
}

fn classify_parts(parts: &[&str], line_index: usize) -> Option<LineItem> {
    let mut money: Vec<i64> = Vec::new();
    let mut quantity: Option<i64> = None;
    let mut sku: Option<String> = None;
    let mut description: Option<String> = None;

    for part in parts {
        if MONEY_TOKEN.is_match(part) && part.split_whitespace().count() == 1 {
            if let Some(cents) = parse_money_cents(part) {
                money.push(cents);
                continue;
            }
        }
        if part.chars().all(|c| c.is_ascii_digit()) {
            let digits = part.len();
            if (5..=12).contains(&digits) && sku.is_none() {
                sku = Some((*part).to_string());
                continue;
            }
            if let Ok(value) = part.parse::<i64>() {
                if (1..=999).contains(&value) && quantity.is_none() {
                    quantity = Some(value);
                    continue;
                }
            }
        }
        // The longest alphabetic part is the description.
        if part.chars().any(|c| c.is_ascii_alphabetic())
            && description.as_ref().is_none_or(|d| d.len() < part.len())
        {
            description = Some((*part).to_string());
        }
    }

    let line_total_cents = *money.last()?;
    let description = clean_description(&description?);
    let quantity = quantity.unwrap_or(1);
    let unit_price = if money.len() >= 2 {
        UnitPrice::from_cents(money[money.len() - 2])
    } else {
        UnitPrice::from_cents(line_total_cents / quantity.max(1))
    };

    let mut item = LineItem::new(description, quantity, unit_price, line_total_cents);
    item.sku = sku;
    item.source_line_index = line_index;
    Some(item)
}

//! Heuristic classification parser.
//!
//! The fallback of last resort: classify every numeric token on a line and
//! assemble a row from the classifications alone. Prices from the right,
//! quantity from the left, SKU from the residual sku-classified tokens,
//! description from the text between.

use tracing::debug;

use crate::models::invoice::{LineItem, UnitPrice, VendorKey};
use crate::rules::numbers::{classify_line, NumberKind, NumericToken};
use crate::rules::parse_money_cents;
use crate::rules::parse_price;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

pub struct HeuristicParser;

impl ParseStrategy for HeuristicParser {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();

        for line in ctx.merged {
            if is_summary_line(&line.text) {
                continue;
            }
            let tokens = classify_line(&line.text, line.source_index);
            let Some(item) = assemble_row(&line.text, &tokens, line.source_index) else {
                continue;
            };
            items.push(item);
        }

        let items = finalize_items(items, "heuristic");
        debug!(items = items.len(), "heuristic parser");

        build_candidate("heuristic", VendorKey::Generic, items, ctx, &[])
    }
}

fn assemble_row(line: &str, tokens: &[NumericToken], source_index: usize) -> Option<LineItem> {
    let prices: Vec<&NumericToken> = tokens
        .iter()
        .filter(|t| t.kind == NumberKind::Price)
        .collect();
    let last_price = prices.last()?;
    let line_total_cents = parse_money_cents(&last_price.raw)?;

    let unit_price_token = prices.len().checked_sub(2).map(|i| prices[i]);
    let quantity_token = tokens
        .iter()
        .find(|t| t.kind == NumberKind::Quantity && t.confidence >= 60);
    let sku_token = tokens.iter().find(|t| t.kind == NumberKind::Sku);

    let quantity = quantity_token.map(|t| t.value as i64).unwrap_or(1);

    // Description: the text between the left-side tokens and the first
    // price, with any SKU token lifted out.
    let desc_start = quantity_token.map(|t| t.end).unwrap_or(0);
    let desc_end = prices.first().map(|t| t.start).unwrap_or(line.len());
    if desc_end <= desc_start {
        return None;
    }
    let mut middle = line[desc_start..desc_end].to_string();
    if let Some(sku) = sku_token {
        middle = middle.replace(&sku.raw, " ");
    }
    let description = clean_description(&crate::text::squash(&middle));
    if description.len() < 3 {
        return None;
    }

    let unit_price = unit_price_token
        .and_then(|t| parse_price(&t.raw))
        .unwrap_or_else(|| UnitPrice::from_cents(line_total_cents / quantity.max(1)));

    let mut item = LineItem::new(description, quantity, unit_price, line_total_cents);
    item.sku = sku_token.map(|t| t.raw.clone());
    item.taxable = taxable_flag(line).unwrap_or(true);
    item.source_line_index = source_index;
    Some(item)
}

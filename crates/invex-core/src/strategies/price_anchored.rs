//! Price-anchored parser.
//!
//! For each line: pull right-anchored prices, then a left-anchored
//! quantity, and use the text between as the description after stripping
//! trailing SKU-shaped tokens.

use tracing::debug;

use crate::models::invoice::{LineItem, UnitPrice, VendorKey};
use crate::rules::layout::{leading_quantity, right_anchored_prices};
use crate::rules::patterns::SKU_TOKEN;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

pub struct PriceAnchoredParser;

impl ParseStrategy for PriceAnchoredParser {
    fn name(&self) -> &'static str {
        "price-anchored"
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();

        for line in ctx.merged {
            if is_summary_line(&line.text) {
                continue;
            }
            let Some(prices) = right_anchored_prices(&line.text) else {
                continue;
            };
            let quantity = leading_quantity(&line.text);
            let (qty, rest_start) = quantity
                .as_ref()
                .map(|q| (q.value, q.rest_start))
                .unwrap_or((1, 0));

            let middle = &line.text[rest_start.min(prices.description_end)..prices.description_end];
            let description = clean_description(middle);
            if description.len() < 3 {
                continue;
            }

            // The middle may still carry a SKU token; lift it out.
            let sku = SKU_TOKEN
                .find_iter(middle)
                .last()
                .map(|m| m.as_str().to_string());

            let unit_price = prices
                .unit_price
                .unwrap_or_else(|| UnitPrice::from_cents(prices.line_total_cents / qty.max(1)));

            let mut item = LineItem::new(
                strip_token(&description, sku.as_deref()),
                qty,
                unit_price,
                prices.line_total_cents,
            );
            item.sku = sku;
            item.taxable = taxable_flag(&line.text).unwrap_or(true);
            item.detected_units = quantity.and_then(|q| q.unit);
            item.source_line_index = line.source_index;
            items.push(item);
        }

        let items = finalize_items(items, "price-anchored");
        debug!(items = items.len(), "price-anchored parser");

        build_candidate("price-anchored", VendorKey::Generic, items, ctx, &[])
    }
}

/// Remove one embedded token from a description, collapsing the gap.
fn strip_token(description: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => crate::text::squash(&description.replace(token, " ")),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{InvoiceHeader, VendorIdentity};
    use crate::rules::totals::extract_totals;
    use crate::text::{normalize, TextQualityAnalyzer};
    use pretty_assertions::assert_eq;

    fn run(raw: &str) -> Option<ParseCandidate> {
        let text = normalize(raw);
        let analyzer = TextQualityAnalyzer::new();
        let merged = analyzer.merge_split_items(&text);
        let totals = extract_totals(&text);
        let vendor = VendorIdentity::new(VendorKey::Generic, 0);
        let header = InvoiceHeader::default();
        let ctx = ParseContext {
            text: &text,
            merged: &merged,
            vendor: &vendor,
            header: &header,
            layout: None,
            totals: &totals,
            adjustments: &[],
        };
        PriceAnchoredParser.run(&ctx)
    }

    #[test]
    fn test_extracts_sku_from_middle() {
        let candidate = run("5 CS 1234567 CHICKEN BREAST 45.99 229.95\nTOTAL 229.95").unwrap();
        assert_eq!(candidate.items.len(), 1);
        let item = &candidate.items[0];
        assert_eq!(item.quantity, 5);
        assert_eq!(item.sku.as_deref(), Some("1234567"));
        assert_eq!(item.description, "CHICKEN BREAST");
        assert_eq!(item.line_total_cents, 22_995);
        assert!(item.math_validated);
    }

    #[test]
    fn test_single_price_row_defaults_quantity() {
        let candidate = run("LATE FEE WAIVER NOTICE\nSHOP TOWELS 14.75\nTOTAL 14.75").unwrap();
        let item = candidate.items.iter().find(|i| i.description == "SHOP TOWELS");
        assert!(item.is_some());
        assert_eq!(item.unwrap().quantity, 1);
    }

    #[test]
    fn test_summary_lines_not_items() {
        let candidate = run("SHOP TOWELS 14.75\nSUBTOTAL 14.75\nSALES TAX 0.89\nTOTAL 15.64").unwrap();
        assert_eq!(candidate.items.len(), 1);
    }
}

//! Cintas uniform/facility-services parser.
//!
//! Cintas rows lead with a single-letter garment class and a quantity, and
//! the totals block closes with `TOTAL USD`. Rental rows frequently omit a
//! SKU; the unit price and extended price anchor the right edge.

use tracing::debug;

use crate::models::invoice::{LineItem, UnitPrice, VendorKey};
use crate::rules::layout::{leading_quantity, right_anchored_prices};
use crate::rules::totals::TotalLabel;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

pub struct CintasParser;

impl ParseStrategy for CintasParser {
    fn name(&self) -> &'static str {
        "cintas"
    }

    fn vendor(&self) -> Option<VendorKey> {
        Some(VendorKey::Cintas)
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

            let (qty, category, rest_start) = match &quantity {
                Some(q) => (
                    q.value,
                    q.category.map(|c| c.to_string()).unwrap_or_default(),
                    q.rest_start,
                ),
                // Service rows without a quantity bill as a single unit.
                None => (1, String::new(), 0),
            };

            let description = clean_description(slice_between(
                &line.text,
                rest_start,
                prices.description_end,
            ));
            if description.len() < 3 {
                continue;
            }

            let unit_price = prices
                .unit_price
                .unwrap_or_else(|| UnitPrice::from_cents(prices.line_total_cents / qty.max(1)));

            let mut item = LineItem::new(description, qty, unit_price, prices.line_total_cents);
            item.category = category;
            item.taxable = taxable_flag(&line.text).unwrap_or(true);
            item.detected_units = quantity.and_then(|q| q.unit);
            item.source_line_index = line.source_index;
            items.push(item);
        }

        let items = finalize_items(items, "cintas");

        // Without a Cintas detection, only rows carrying the garment class
        // prefix justify claiming this layout.
        let claims_layout = ctx.vendor.key == VendorKey::Cintas
            || items.iter().any(|i| !i.category.is_empty());
        if !claims_layout {
            return None;
        }
        debug!(items = items.len(), "cintas parser");

        build_candidate(
            "cintas",
            VendorKey::Cintas,
            items,
            ctx,
            &[TotalLabel::TotalUsd, TotalLabel::InvoiceTotal],
        )
    }
}

fn slice_between(line: &str, start: usize, end: usize) -> &str {
    let start = start.min(line.len()).min(end);
    let end = end.min(line.len());
    &line[start..end]
}

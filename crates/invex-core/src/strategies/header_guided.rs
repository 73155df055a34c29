//! Header-guided parser.
//!
//! Requires a detected table header with at least three columns, then reads
//! every subsequent line by column boundaries. Group subtotals are recorded
//! and skipped; parsing must continue past them so rows below a section
//! subtotal are still captured.

use tracing::debug;

use crate::models::invoice::{LineItem, UnitPrice, VendorKey};
use crate::rules::layout::ColumnKind;
use crate::rules::parse_money_cents;
use crate::rules::parse_price;
use crate::rules::patterns::GROUP_CONTEXT;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, ParseCandidate,
    ParseContext, ParseStrategy,
};

pub struct HeaderGuidedParser;

impl ParseStrategy for HeaderGuidedParser {
    fn name(&self) -> &'static str {
        "header-guided"
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let layout = ctx.layout?;
        if layout.columns.len() < 3 {
            return None;
        }

        let mut items = Vec::new();
        let mut group_subtotals = 0usize;

        for (index, line) in ctx.text.lines.iter().enumerate().skip(layout.header_line + 1) {
            if line.trim().is_empty() {
                continue;
            }
            if GROUP_CONTEXT.is_match(line) {
                group_subtotals += 1;
                continue;
            }
            if is_summary_line(line) {
                continue;
            }

            let amount = layout
                .column_of(ColumnKind::Amount)
                .and_then(|col| parse_money_cents(layout.cell(line, col)));
            let Some(line_total) = amount else {
                continue;
            };

            let quantity = layout
                .column_of(ColumnKind::Quantity)
                .and_then(|col| layout.cell(line, col).parse::<i64>().ok())
                .filter(|q| (1..=999).contains(q))
                .unwrap_or(1);

            let unit_price = layout
                .column_of(ColumnKind::UnitPrice)
                .and_then(|col| parse_price(layout.cell(line, col)))
                .unwrap_or_else(|| UnitPrice::from_cents(line_total / quantity.max(1)));

            let description = layout
                .column_of(ColumnKind::Description)
                .map(|col| clean_description(layout.cell(line, col)))
                .unwrap_or_default();
            if description.len() < 3 {
                continue;
            }

            let mut item = LineItem::new(description, quantity, unit_price, line_total);
            item.sku = layout
                .column_of(ColumnKind::Sku)
                .map(|col| layout.cell(line, col).to_string())
                .filter(|s| s.chars().all(|c| c.is_ascii_digit()) && s.len() >= 5);
            item.detected_units = layout
                .column_of(ColumnKind::Pack)
                .map(|col| layout.cell(line, col).to_string())
                .filter(|s| !s.is_empty());
            item.source_line_index = index;
            items.push(item);
        }

        let items = finalize_items(items, "header-guided");
        debug!(items = items.len(), group_subtotals, "header-guided parser");

        build_candidate("header-guided", VendorKey::Generic, items, ctx, &[])
    }
}

//! Sysco foodservice parser.
//!
//! Sysco rows carry `qty unit 7-digit-sku description pack price extended`
//! and the invoice closes with `INVOICE TOTAL`. Category sections end in
//! `GROUP TOTAL` rows that must be recorded but never emitted as items.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::invoice::{LineItem, VendorKey};
use crate::rules::parse_price;
use crate::rules::parse_money_cents;
use crate::rules::patterns::PACK_SIZE;
use crate::rules::totals::TotalLabel;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

lazy_static! {
    // qty, unit, 7-digit SKU, description, unit price, extended price.
    static ref SYSCO_ITEM: Regex = Regex::new(
        r"^\s*(\d{1,3})\s+(CS|EA|LB|GAL|CT|PK)\s+(\d{7})\s+(.+?)\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();
}

pub struct SyscoParser;

impl ParseStrategy for SyscoParser {
    fn name(&self) -> &'static str {
        "sysco"
    }

    fn vendor(&self) -> Option<VendorKey> {
        Some(VendorKey::Sysco)
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();
        let mut group_totals = 0usize;

        for line in ctx.merged {
            let upper = line.text.to_uppercase();
            if upper.contains("GROUP TOTAL") {
                // Section subtotal: record and keep going so the rows below
                // it are still captured.
                group_totals += 1;
                continue;
            }
            if is_summary_line(&line.text) {
                continue;
            }
            let Some(caps) = SYSCO_ITEM.captures(&line.text) else {
                continue;
            };

            let Ok(quantity) = caps[1].parse::<i64>() else {
                continue;
            };
            let unit = caps[2].to_string();
            let sku = caps[3].to_string();
            let description = clean_description(&caps[4]);
            let Some(unit_price) = parse_price(&caps[5]) else {
                continue;
            };
            let Some(line_total) = parse_money_cents(&caps[6]) else {
                continue;
            };

            let mut item = LineItem::new(description, quantity, unit_price, line_total);
            item.sku = Some(sku);
            item.detected_units = Some(unit);
            item.taxable = taxable_flag(&line.text).unwrap_or(false);
            item.source_line_index = line.source_index;
            if let Some(pack) = PACK_SIZE.find(&line.text) {
                item.category = pack.as_str().to_string();
            }
            items.push(item);
        }

        let items = finalize_items(items, "sysco");
        debug!(items = items.len(), group_totals, "sysco parser");

        build_candidate(
            "sysco",
            VendorKey::Sysco,
            items,
            ctx,
            &[TotalLabel::InvoiceTotal, TotalLabel::TotalUsd],
        )
    }
}

//! US Foods parser.
//!
//! US Foods rows lead with an 8-digit product number followed by the
//! quantity, and the invoice closes with `TOTAL DUE`.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::invoice::{LineItem, VendorKey};
use crate::rules::parse_money_cents;
use crate::rules::parse_price;
use crate::rules::patterns::{is_unit_token, PACK_SIZE};
use crate::rules::totals::TotalLabel;

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

lazy_static! {
    // 8-digit product number, qty, optional unit, description, prices.
    static ref USF_ITEM: Regex = Regex::new(
        r"^\s*(\d{8})\s+(\d{1,3})\s+(?:([A-Z]{2,3})\s+)?(.+?)\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();
}

pub struct UsFoodsParser;

impl ParseStrategy for UsFoodsParser {
    fn name(&self) -> &'static str {
        "usfoods"
    }

    fn vendor(&self) -> Option<VendorKey> {
        Some(VendorKey::Usfoods)
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();

        for line in ctx.merged {
            if is_summary_line(&line.text) {
                continue;
            }
            let Some(caps) = USF_ITEM.captures(&line.text) else {
                continue;
            };

            let sku = caps[1].to_string();
            let Ok(quantity) = caps[2].parse::<i64>() else {
                continue;
            };
            let unit = caps
                .get(3)
                .map(|m| m.as_str())
                .filter(|u| is_unit_token(u))
                .map(str::to_string);
            let description = clean_description(&caps[4]);
            let Some(unit_price) = parse_price(&caps[5]) else {
                continue;
            };
            let Some(line_total) = parse_money_cents(&caps[6]) else {
                continue;
            };

            let mut item = LineItem::new(description, quantity, unit_price, line_total);
            item.sku = Some(sku);
            item.detected_units = unit;
            item.taxable = taxable_flag(&line.text).unwrap_or(false);
            item.source_line_index = line.source_index;
            if let Some(pack) = PACK_SIZE.find(&line.text) {
                item.category = pack.as_str().to_string();
            }
            items.push(item);
        }

        let items = finalize_items(items, "usfoods");
        debug!(items = items.len(), "usfoods parser");

        build_candidate(
            "usfoods",
            VendorKey::Usfoods,
            items,
            ctx,
            &[TotalLabel::TotalDue, TotalLabel::AmountDue, TotalLabel::BalanceDue],
        )
    }
}

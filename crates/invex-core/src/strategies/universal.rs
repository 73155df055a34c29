//! Universal-pattern parser.
//!
//! A ranked list of row shapes; the first rule to match a line wins. Rules
//! are ordered most-specific first so a SKU-carrying row never degrades
//! into a description-only match.

use tracing::debug;

use crate::models::invoice::{Cents, LineItem, UnitPrice, VendorKey};
use crate::rules::parse_money_cents;
use crate::rules::parse_price;
use crate::rules::patterns::{
    ITEM_DESC_PRICE, ITEM_DESC_QTY_PRICE_EXT, ITEM_QTY_DESC_PRICE_EXT, ITEM_QTY_SKU_DESC_PRICE_EXT,
    ITEM_SKU_QTY_DESC_PRICE_EXT,
};

use super::{
    build_candidate, clean_description, finalize_items, is_summary_line, taxable_flag,
    ParseCandidate, ParseContext, ParseStrategy,
};

pub struct UniversalPatternParser;

struct ParsedRow {
    sku: Option<String>,
    quantity: i64,
    unit: Option<String>,
    description: String,
    unit_price: Option<UnitPrice>,
    line_total_cents: Cents,
}

impl ParseStrategy for UniversalPatternParser {
    fn name(&self) -> &'static str {
        "universal"
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate> {
        let mut items = Vec::new();

        for line in ctx.merged {
            if is_summary_line(&line.text) {
                continue;
            }
            let Some(row) = match_row(&line.text) else {
                continue;
            };
            if row.description.len() < 3 {
                continue;
            }

            let unit_price = row
                .unit_price
                .unwrap_or_else(|| UnitPrice::from_cents(row.line_total_cents / row.quantity.max(1)));

            let mut item = LineItem::new(
                row.description,
                row.quantity,
                unit_price,
                row.line_total_cents,
            );
            item.sku = row.sku;
            item.detected_units = row.unit;
            item.taxable = taxable_flag(&line.text).unwrap_or(true);
            item.source_line_index = line.source_index;
            items.push(item);
        }

        let items = finalize_items(items, "universal");
        debug!(items = items.len(), "universal parser");

        build_candidate("universal", VendorKey::Generic, items, ctx, &[])
    }
}

/// Try each ranked rule; first match wins.
fn match_row(line: &str) -> Option<ParsedRow> {
    if let Some(caps) = ITEM_SKU_QTY_DESC_PRICE_EXT.captures(line) {
        return Some(ParsedRow {
            sku: Some(caps[1].to_string()),
            quantity: caps[2].parse().ok()?,
            unit: None,
            description: clean_description(&caps[3]),
            unit_price: parse_price(&caps[4]),
            line_total_cents: parse_money_cents(&caps[5])?,
        });
    }
    if let Some(caps) = ITEM_QTY_SKU_DESC_PRICE_EXT.captures(line) {
        return Some(ParsedRow {
            sku: Some(caps[3].to_string()),
            quantity: caps[1].parse().ok()?,
            unit: caps.get(2).map(|m| m.as_str().to_string()),
            description: clean_description(&caps[4]),
            unit_price: parse_price(&caps[5]),
            line_total_cents: parse_money_cents(&caps[6])?,
        });
    }
    if let Some(caps) = ITEM_QTY_DESC_PRICE_EXT.captures(line) {
        return Some(ParsedRow {
            sku: None,
            quantity: caps[1].parse().ok()?,
            unit: None,
            description: clean_description(&caps[2]),
            unit_price: parse_price(&caps[3]),
            line_total_cents: parse_money_cents(&caps[4])?,
        });
    }
    if let Some(caps) = ITEM_DESC_QTY_PRICE_EXT.captures(line) {
        return Some(ParsedRow {
            sku: None,
            quantity: caps[2].parse().ok()?,
            unit: None,
            description: clean_description(&caps[1]),
            unit_price: parse_price(&caps[3]),
            line_total_cents: parse_money_cents(&caps[4])?,
        });
    }
    if let Some(caps) = ITEM_DESC_PRICE.captures(line) {
        return Some(ParsedRow {
            sku: None,
            quantity: 1,
            unit: None,
            description: clean_description(&caps[1]),
            unit_price: None,
            line_total_cents: parse_money_cents(&caps[2])?,
        });
    }
    None
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
        UniversalPatternParser.run(&ctx)
    }

    #[test]
    fn test_mixed_row_shapes() {
        let candidate = run(
            "12345678 5 CHICKEN BREAST 45.99 229.95\n\
             2 CS 7654321 LONG GRAIN RICE 25.00 50.00\n\
             3 DOOR MATS 9.00 27.00\n\
             DELIVERY NOTICE POSTED 2 4.00 8.00\n\
             MISC WIDGET 12.34\n\
             TOTAL 327.29",
        )
        .unwrap();

        assert_eq!(candidate.items.len(), 5);
        assert_eq!(candidate.items[0].sku.as_deref(), Some("12345678"));
        assert_eq!(candidate.items[1].sku.as_deref(), Some("7654321"));
        assert_eq!(candidate.items[1].detected_units.as_deref(), Some("CS"));
        assert_eq!(candidate.items[2].description, "DOOR MATS");
        assert_eq!(candidate.items[3].quantity, 2);
        assert_eq!(candidate.items[4].description, "MISC WIDGET");
        assert_eq!(candidate.items[4].quantity, 1);
    }

    #[test]
    fn test_first_match_wins_per_line() {
        // A SKU-led row must bind to the SKU rule, not the qty/desc rule.
        let candidate = run("1234567 2 WIDGETS PREMIUM 10.00 20.00\nTOTAL 20.00").unwrap();
        let item = &candidate.items[0];
        assert_eq!(item.sku.as_deref(), Some("1234567"));
        assert_eq!(item.quantity, 2);
    }
}

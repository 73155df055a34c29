//! Table layout detection over plain-text invoices.
//!
//! Finds the item-table header row, estimates column boundaries from
//! whitespace agreement, and provides the two anchored extractors the parser
//! strategies share: right-anchored prices and left-anchored quantities.

use tracing::debug;

use crate::models::invoice::{Cents, UnitPrice};
use crate::rules::patterns::{
    is_unit_token, COL_AMOUNT, COL_DESC, COL_PACK, COL_PRICE, COL_QTY, COL_SKU, LEADING_QTY,
    TRAILING_MONEY,
};
use crate::rules::{parse_money_cents, parse_price};
use crate::text::InvoiceText;

/// Role of a detected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Quantity,
    Sku,
    Description,
    Pack,
    UnitPrice,
    Amount,
    Other,
}

/// One detected column span (byte offsets into a line).
#[derive(Debug, Clone)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
    pub kind: ColumnKind,
}

/// A detected item-table layout.
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Index of the header row in `InvoiceText::lines`.
    pub header_line: usize,

    /// Column spans, left to right.
    pub columns: Vec<ColumnSpan>,
}

impl TableLayout {
    /// Slice a data line by a column span, clamped to the line length and
    /// to char boundaries.
    pub fn cell<'a>(&self, line: &'a str, column: &ColumnSpan) -> &'a str {
        let start = floor_char_boundary(line, column.start.min(line.len()));
        let end = floor_char_boundary(line, column.end.min(line.len()));
        line[start..end.max(start)].trim()
    }

    pub fn column_of(&self, kind: ColumnKind) -> Option<&ColumnSpan> {
        self.columns.iter().find(|c| c.kind == kind)
    }
}

/// Prices pulled from the right edge of a line.
#[derive(Debug, Clone)]
pub struct AnchoredPrices {
    /// The last money token: the extended line total.
    pub line_total_cents: Cents,

    /// The token before it, when present: the unit price.
    pub unit_price: Option<UnitPrice>,

    /// A third token, when present (some layouts print catch-weight value).
    pub extra_cents: Option<Cents>,

    /// Byte offset where the price block starts; description ends here.
    pub description_end: usize,
}

/// Quantity pulled from the left edge of a line.
#[derive(Debug, Clone)]
pub struct LeadingQuantity {
    pub value: i64,

    /// Unit-of-measure token when one follows the quantity.
    pub unit: Option<String>,

    /// Single-letter category prefix (garment-service layouts).
    pub category: Option<char>,

    /// Byte offset where the remainder of the line starts.
    pub rest_start: usize,
}

const HEADER_SCAN_LINES: usize = 30;
const BOUNDARY_AGREEMENT: f32 = 0.6;

fn floor_char_boundary(line: &str, mut index: usize) -> usize {
    while index > 0 && !line.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Scan the first body lines for a table header row and derive column spans.
pub fn detect_table(text: &InvoiceText) -> Option<TableLayout> {
    let header_line = find_header_row(text)?;
    let columns = derive_columns(text, header_line);
    if columns.len() < 3 {
        return None;
    }
    debug!(header_line, columns = columns.len(), "detected item table");
    Some(TableLayout { header_line, columns })
}

fn find_header_row(text: &InvoiceText) -> Option<usize> {
    text.lines
        .iter()
        .take(HEADER_SCAN_LINES)
        .position(|line| header_keyword_count(line) >= 3)
}

/// How many distinct column-header keywords a line carries.
pub fn header_keyword_count(line: &str) -> usize {
    [
        COL_QTY.is_match(line),
        COL_SKU.is_match(line),
        COL_DESC.is_match(line),
        COL_PACK.is_match(line),
        COL_PRICE.is_match(line),
        COL_AMOUNT.is_match(line),
    ]
    .iter()
    .filter(|&&hit| hit)
    .count()
}

/// Estimate column boundaries: positions where enough sampled data lines
/// have whitespace, then classify each span by the header text above it.
fn derive_columns(text: &InvoiceText, header_line: usize) -> Vec<ColumnSpan> {
    let header = &text.lines[header_line];
    let sample: Vec<&String> = text
        .lines
        .iter()
        .skip(header_line + 1)
        .filter(|l| !l.trim().is_empty())
        .take(20)
        .collect();
    if sample.is_empty() {
        return Vec::new();
    }

    let width = sample
        .iter()
        .map(|l| l.len())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    // A column boundary is a position where most sampled lines are blank.
    let mut blank_ratio = vec![0f32; width];
    for (pos, ratio) in blank_ratio.iter_mut().enumerate() {
        let blank = sample
            .iter()
            .filter(|l| l.as_bytes().get(pos).map(|&b| b == b' ').unwrap_or(true))
            .count();
        *ratio = blank as f32 / sample.len() as f32;
    }

    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for pos in 0..width {
        let is_boundary = blank_ratio[pos] >= BOUNDARY_AGREEMENT;
        match (is_boundary, start) {
            (false, None) => start = Some(pos),
            (true, Some(s)) => {
                // Require a boundary at least two columns wide to close a
                // span; single blanks appear inside descriptions.
                let run = blank_run_length(&blank_ratio, pos);
                if run >= 2 || pos + run >= width {
                    spans.push((s, pos));
                    start = None;
                }
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, width));
    }

    let words = header_words(header);
    spans
        .into_iter()
        .map(|(s, e)| ColumnSpan {
            start: s,
            end: e,
            kind: classify_column(&words, s, e),
        })
        .collect()
}

fn blank_run_length(blank_ratio: &[f32], from: usize) -> usize {
    blank_ratio[from..]
        .iter()
        .take_while(|&&r| r >= BOUNDARY_AGREEMENT)
        .count()
}

fn header_words(header: &str) -> Vec<(usize, usize, String)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, b) in header.bytes().enumerate() {
        match (b == b' ', start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                words.push((s, i, header[s..i].to_string()));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, header.len(), header[s..].to_string()));
    }
    words
}

/// Classify a data-derived span by the header words above it. Data columns
/// are often narrower than their labels, so overlap is tested with slack.
fn classify_column(words: &[(usize, usize, String)], start: usize, end: usize) -> ColumnKind {
    const SLACK: usize = 3;
    let label: Vec<&str> = words
        .iter()
        .filter(|(ws, we, _)| *ws < end + SLACK && *we + SLACK > start)
        .map(|(_, _, w)| w.as_str())
        .collect();
    let label = label.join(" ");
    if label.trim().is_empty() {
        return ColumnKind::Other;
    }
    let label = label.as_str();
    if COL_QTY.is_match(label) {
        ColumnKind::Quantity
    } else if COL_SKU.is_match(label) {
        ColumnKind::Sku
    } else if COL_DESC.is_match(label) {
        ColumnKind::Description
    } else if COL_PRICE.is_match(label) {
        ColumnKind::UnitPrice
    } else if COL_AMOUNT.is_match(label) {
        ColumnKind::Amount
    } else if COL_PACK.is_match(label) {
        ColumnKind::Pack
    } else {
        ColumnKind::Other
    }
}

/// Pull up to three successive money tokens from the right edge of a line.
/// The last is the line total, the one before it the unit price.
pub fn right_anchored_prices(line: &str) -> Option<AnchoredPrices> {
    let mut remaining = line.trim_end();
    let mut values: Vec<(String, usize)> = Vec::new();

    for _ in 0..3 {
        let Some(caps) = TRAILING_MONEY.captures(remaining) else {
            break;
        };
        let m = caps.get(1).unwrap();
        values.push((m.as_str().to_string(), m.start()));
        remaining = remaining[..m.start()].trim_end();
    }

    if values.is_empty() {
        return None;
    }

    // values[0] is the rightmost token.
    let line_total_cents = parse_money_cents(&values[0].0)?;
    let unit_price = values.get(1).and_then(|(raw, _)| parse_price(raw));
    let extra_cents = values.get(2).and_then(|(raw, _)| parse_money_cents(raw));
    let description_end = values.last().map(|(_, start)| *start).unwrap_or(0);

    Some(AnchoredPrices {
        line_total_cents,
        unit_price,
        extra_cents,
        description_end,
    })
}

/// Pull a quantity (1-999) with optional category prefix and unit token
/// from the left edge of a line.
pub fn leading_quantity(line: &str) -> Option<LeadingQuantity> {
    let caps = LEADING_QTY.captures(line)?;
    let value: i64 = caps[2].parse().ok()?;
    if !(1..=999).contains(&value) {
        return None;
    }

    let unit = caps
        .get(3)
        .map(|m| m.as_str())
        .filter(|u| is_unit_token(u))
        .map(|u| u.to_uppercase());

    // When the captured token is not a known unit it belongs to the
    // description; the remainder starts right after the quantity.
    let rest_start = match (&unit, caps.get(3)) {
        (Some(_), Some(m)) => m.end(),
        _ => caps.get(2).unwrap().end(),
    };

    Some(LeadingQuantity {
        value,
        unit,
        category: caps.get(1).and_then(|m| m.as_str().chars().next()),
        rest_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_right_anchored_two_prices() {
        let anchored = right_anchored_prices("CHICKEN BREAST 45.99 229.95").unwrap();
        assert_eq!(anchored.line_total_cents, 22995);
        assert_eq!(anchored.unit_price.unwrap().cents, 4599);
        assert!(anchored.extra_cents.is_none());
    }

    #[test]
    fn test_right_anchored_single_price() {
        let anchored = right_anchored_prices("SHOP TOWELS 14.75").unwrap();
        assert_eq!(anchored.line_total_cents, 1475);
        assert!(anchored.unit_price.is_none());
    }

    #[test]
    fn test_right_anchored_three_decimal_unit_price() {
        let anchored = right_anchored_prices("BULK FLOUR 12.375 297.00").unwrap();
        assert_eq!(anchored.line_total_cents, 29700);
        let unit = anchored.unit_price.unwrap();
        assert_eq!(unit.cents, 1238);
    }

    #[test]
    fn test_right_anchored_trailing_tax_flag() {
        let anchored = right_anchored_prices("DEGREASER 22.00 44.00 Y").unwrap();
        assert_eq!(anchored.line_total_cents, 4400);
        assert_eq!(anchored.unit_price.unwrap().cents, 2200);
    }

    #[test]
    fn test_no_prices() {
        assert!(right_anchored_prices("SOLD TO: POCOMOKE DINER").is_none());
    }

    #[test]
    fn test_leading_quantity_with_category() {
        let q = leading_quantity("C 13 UNIFORM PANTS 4.50 58.50").unwrap();
        assert_eq!(q.value, 13);
        assert_eq!(q.category, Some('C'));
        assert_eq!(q.unit, None);
    }

    #[test]
    fn test_leading_quantity_with_unit() {
        let q = leading_quantity("5 CS 1234567 CHICKEN").unwrap();
        assert_eq!(q.value, 5);
        assert_eq!(q.unit.as_deref(), Some("CS"));
    }

    #[test]
    fn test_leading_quantity_rejects_sku() {
        assert!(leading_quantity("1234567 CHICKEN").is_none());
    }

    #[test]
    fn test_detect_table() {
        let text = normalize(
            "ACME FOODS\n\
             QTY   ITEM #    DESCRIPTION           PRICE    AMOUNT\n\
             5     1234567   CHICKEN BREAST        45.99    229.95\n\
             2     7654321   LONG GRAIN RICE       25.00    50.00\n\
             1     5550123   PAPER TOWELS          19.99    19.99\n",
        );
        let layout = detect_table(&text).unwrap();
        assert_eq!(layout.header_line, 1);
        assert!(layout.columns.len() >= 3);
        assert!(layout.column_of(ColumnKind::Quantity).is_some());
        assert!(layout.column_of(ColumnKind::Amount).is_some());
    }

    #[test]
    fn test_no_table_without_header() {
        let text = normalize("SHOP TOWELS 14.75\nDEGREASER 22.00\n");
        assert!(detect_table(&text).is_none());
    }

    #[test]
    fn test_header_keyword_count() {
        assert_eq!(
            header_keyword_count("QTY ITEM # DESCRIPTION PACK PRICE AMOUNT"),
            6
        );
        assert_eq!(header_keyword_count("SOLD TO: SOMEONE"), 0);
    }
}

//! Named regex rules for invoice extraction.
//!
//! Every layout-sensitive rule lives here under a single name with a single
//! responsibility, anchored where possible. Extractors rank rules
//! explicitly; nothing chains unanchored patterns and takes the first hit.

use lazy_static::lazy_static;
use regex::Regex;

// A money value: optional dollar sign, optional comma groups, exactly two
// decimals. Reused as a fragment by the composed rules below.
const MONEY: &str = r"\$?\s*((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})";

lazy_static! {
    // ── Money tokens ────────────────────────────────────────────────────

    /// Any money token inside a line.
    pub static ref MONEY_TOKEN: Regex =
        Regex::new(r"\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}\b").unwrap();

    /// A trailing money token, two or three decimals (unit prices may carry
    /// three).
    pub static ref TRAILING_MONEY: Regex =
        Regex::new(r"(\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2,3})\s*[A-Z]?\s*$").unwrap();

    /// A line holding nothing but one money value.
    pub static ref VALUE_ONLY_LINE: Regex =
        Regex::new(&format!(r"^\s*{MONEY}\s*$")).unwrap();

    /// A line holding exactly two money values.
    pub static ref TWO_VALUE_LINE: Regex =
        Regex::new(&format!(r"^\s*{MONEY}\s+{MONEY}\s*$")).unwrap();

    /// A line holding exactly three money values.
    pub static ref THREE_VALUE_LINE: Regex =
        Regex::new(&format!(r"^\s*{MONEY}\s+{MONEY}\s+{MONEY}\s*$")).unwrap();

    // ── Totals: same-line label + value rules ───────────────────────────

    /// Priority-1 total labels with the value on the same line.
    pub static ref TOTAL_USD_LINE: Regex =
        Regex::new(&format!(r"(?i)\b(?:TOTAL\s+USD|INVOICE\s+TOTAL)\b[^0-9$\n]{{0,24}}{MONEY}")).unwrap();

    /// Priority-2 total labels with the value on the same line.
    pub static ref GRAND_TOTAL_LINE: Regex =
        Regex::new(&format!(r"(?i)\b(?:GRAND\s+TOTAL|AMOUNT\s+DUE|BALANCE\s+DUE)\b[^0-9$\n]{{0,24}}{MONEY}")).unwrap();

    /// Priority-3 `TOTAL DUE` with the value on the same line.
    pub static ref TOTAL_DUE_LINE: Regex =
        Regex::new(&format!(r"(?i)\bTOTAL\s+DUE\b[^0-9$\n]{{0,24}}{MONEY}")).unwrap();

    /// Bare `TOTAL` with a value. Callers must reject SUBTOTAL contexts and
    /// only consult this rule when no higher-priority rule matched the line.
    pub static ref BARE_TOTAL_LINE: Regex =
        Regex::new(&format!(r"(?i)\bTOTAL\b[^0-9$\n]{{0,24}}{MONEY}")).unwrap();

    /// `SUBTOTAL` with the value on the same line.
    pub static ref SUBTOTAL_LINE: Regex =
        Regex::new(&format!(r"(?i)\bSUB\s*TOTAL\b[^0-9$\n]{{0,24}}{MONEY}")).unwrap();

    /// Sales tax with the value on the same line. Callers must reject
    /// matches whose value is a percentage rate.
    pub static ref TAX_LINE: Regex =
        Regex::new(&format!(r"(?i)\b(?:SALES\s+TAX|TAX)\b[^0-9$\n%]{{0,24}}{MONEY}")).unwrap();

    // ── Totals: label-only and layout rules ─────────────────────────────

    /// A line that is only a total label (split-line and stacked layouts).
    pub static ref TOTAL_LABEL_ONLY: Regex = Regex::new(
        r"(?i)^\s*(TOTAL\s+USD|INVOICE\s+TOTAL|GRAND\s+TOTAL|AMOUNT\s+DUE|BALANCE\s+DUE|TOTAL\s+DUE|TOTAL)\s*:?\s*$",
    )
    .unwrap();

    /// A line that is only a `SUBTOTAL` label.
    pub static ref SUBTOTAL_LABEL_ONLY: Regex =
        Regex::new(r"(?i)^\s*SUB\s*TOTAL\s*:?\s*$").unwrap();

    /// A line that is only a tax label.
    pub static ref TAX_LABEL_ONLY: Regex =
        Regex::new(r"(?i)^\s*(?:SALES\s+)?TAX\s*:?\s*$").unwrap();

    /// The tax word itself, for locating the label within a line.
    pub static ref TAX_WORD: Regex = Regex::new(r"(?i)\bTAX\b").unwrap();

    /// Horizontal totals header: three labels on one line, values beneath.
    pub static ref HORIZONTAL_TOTALS_HEADER: Regex = Regex::new(
        r"(?i)^\s*SUB\s*TOTAL\s+(?:SALES\s+)?TAX\s+(TOTAL\s+USD|INVOICE\s+TOTAL|TOTAL)\s*$",
    )
    .unwrap();

    /// Context that disqualifies a TOTAL candidate as a group subtotal.
    pub static ref GROUP_CONTEXT: Regex =
        Regex::new(r"(?i)\b(?:GROUP|CATEGORY|SECTION|DEPT)\b|\*{3,}").unwrap();

    // ── Line-item rules, ranked by the universal strategy ───────────────

    /// `sku qty description unit-price extended`.
    pub static ref ITEM_SKU_QTY_DESC_PRICE_EXT: Regex = Regex::new(
        r"^\s*(\d{5,12})\s+(\d{1,3})\s+(.+?)\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();

    /// `qty [unit] sku description unit-price extended`.
    pub static ref ITEM_QTY_SKU_DESC_PRICE_EXT: Regex = Regex::new(
        r"^\s*(\d{1,3})\s+(?:([A-Z]{2,3})\s+)?(\d{5,12})\s+(.+?)\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();

    /// `qty description unit-price extended`.
    pub static ref ITEM_QTY_DESC_PRICE_EXT: Regex = Regex::new(
        r"^\s*(\d{1,3})\s+(.+?)\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();

    /// `description qty unit-price extended`.
    pub static ref ITEM_DESC_QTY_PRICE_EXT: Regex = Regex::new(
        r"^\s*([A-Za-z].*?)\s+(\d{1,3})\s+\$?([\d,]+\.\d{2,3})\s+\$?([\d,]+\.\d{2})\s*[A-Z]?\s*$",
    )
    .unwrap();

    /// `description price` single-price rows.
    pub static ref ITEM_DESC_PRICE: Regex = Regex::new(
        r"^\s*([A-Za-z][A-Za-z0-9 .,&'\-/#%()]{2,}?)\s+\$?([\d,]+\.\d{2})\s*$",
    )
    .unwrap();

    /// Left-anchored quantity with optional category prefix and unit.
    pub static ref LEADING_QTY: Regex =
        Regex::new(r"^\s*([CFPD])?\s*(\d{1,3})\s*([A-Z]{1,4})?\b").unwrap();

    /// A standalone SKU-shaped token.
    pub static ref SKU_TOKEN: Regex = Regex::new(r"\b\d{5,12}\b").unwrap();

    /// Pack size like `6/10 LB` or `4/1 GAL`.
    pub static ref PACK_SIZE: Regex = Regex::new(
        r"\b(\d{1,3})\s*/\s*(\d+(?:\.\d+)?)\s*(LB|OZ|GAL|CT|QT|PT|KG|G|ML|L|#)\b",
    )
    .unwrap();

    /// A weight/volume amount like `50 LB`.
    pub static ref WEIGHT_VOLUME: Regex =
        Regex::new(r"\b(\d{1,4})\s*(LB|OZ|GAL|QT|PT|KG|ML|L)\b").unwrap();

    /// Any numeric literal, for the token classifier.
    pub static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"\$?\d[\d,]*(?:\.\d+)?").unwrap();

    // ── Table header keywords (column detection) ────────────────────────

    pub static ref COL_QTY: Regex = Regex::new(r"(?i)\b(?:QTY|QUANTITY|ORD(?:ERED)?|SHIP(?:PED)?)\b").unwrap();
    pub static ref COL_SKU: Regex = Regex::new(r"(?i)\b(?:SKU|ITEM\s*#|ITEM\s+(?:NO|CODE)|PROD(?:UCT)?\s*#?)\b").unwrap();
    pub static ref COL_DESC: Regex = Regex::new(r"(?i)\bDESC(?:RIPTION)?\b").unwrap();
    pub static ref COL_PACK: Regex = Regex::new(r"(?i)\b(?:PACK|SIZE|PACK/SIZE|UOM|UNIT)\b").unwrap();
    pub static ref COL_PRICE: Regex = Regex::new(r"(?i)\b(?:UNIT\s+PRICE|PRICE|RATE|EACH)\b").unwrap();
    pub static ref COL_AMOUNT: Regex = Regex::new(r"(?i)\b(?:TOTAL|AMOUNT|EXT(?:ENDED)?|EXT\s+PRICE)\b").unwrap();

    // ── Header fields ───────────────────────────────────────────────────

    /// Labeled invoice number. Callers reject captures that are label words.
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)\bINVOICE\s*(?:#|NO\.?|NUM(?:BER)?)?\s*:?\s+([A-Z0-9][A-Z0-9-]{3,})",
    )
    .unwrap();

    /// Labeled account/customer number.
    pub static ref ACCOUNT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:ACCOUNT|ACCT|CUST(?:OMER)?)\s*(?:#|NO\.?)\s*:?\s*([A-Z0-9-]{3,})",
    )
    .unwrap();

    /// Labeled customer name.
    pub static ref CUSTOMER_NAME: Regex =
        Regex::new(r"(?i)\bCUSTOMER(?:\s+NAME)?\s*:\s*(.+)$").unwrap();

    pub static ref SOLD_TO: Regex = Regex::new(r"(?i)\bSOLD\s+TO\s*:?\s*(.*)$").unwrap();
    pub static ref BILL_TO: Regex = Regex::new(r"(?i)\bBILL\s+TO\s*:?\s*(.*)$").unwrap();
    pub static ref SHIP_TO: Regex = Regex::new(r"(?i)\bSHIP\s+TO\s*:?\s*(.*)$").unwrap();

    /// Numeric date `MM/DD/YYYY` (or two-digit year).
    pub static ref DATE_MDY: Regex =
        Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4}|\d{2})\b").unwrap();

    /// Long date `JAN 15, 2024` / `January 15 2024`.
    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)[A-Z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b",
    )
    .unwrap();

    /// A line labeling the invoice date.
    pub static ref DATE_LABEL: Regex =
        Regex::new(r"(?i)\b(?:INVOICE\s+)?DATE\s*:?").unwrap();

    // ── Adjustment vocabulary ───────────────────────────────────────────

    /// Fee labels. Matches produce positive adjustments.
    pub static ref FEE_LABEL: Regex = Regex::new(
        r"(?i)\b(FUEL\s+SURCHARGE|ENERGY\s+SURCHARGE|ENVIRONMENTAL\s+(?:FEE|CHARGE)|DELIVERY\s+(?:FEE|CHARGE)|ROUTE\s+CHARGE|STOP\s+CHARGE|HANDLING\s+(?:FEE|CHARGE)|SMALL\s+ORDER\s+(?:FEE|CHARGE)|RUSH\s+(?:FEE|CHARGE)|PALLET\s+(?:FEE|CHARGE)|BOTTLE\s+DEPOSIT|COLD\s+CHAIN\s+(?:FEE|CHARGE)|MINIMUM\s+ORDER\s+(?:FEE|CHARGE)|ADMIN(?:ISTRATIVE)?\s+FEE|SERVICE\s+(?:FEE|CHARGE))\b",
    )
    .unwrap();

    /// Credit labels. Matches produce negative adjustments.
    pub static ref CREDIT_LABEL: Regex = Regex::new(
        r"(?i)\b(VOLUME\s+DISCOUNT|PROMOTIONAL\s+DISCOUNT|CONTRACT\s+DISCOUNT|LOYALTY\s+DISCOUNT|REBATE|RETURN\s+CREDIT|PRICE\s+ADJUSTMENT|ALLOWANCE|CUSTOMER\s+CREDIT|CREDIT\s+MEMO)\b",
    )
    .unwrap();

    // ── Address / garbage detection ─────────────────────────────────────

    /// Two-letter state followed by a ZIP code.
    pub static ref STATE_ZIP: Regex =
        Regex::new(r"\b[A-Z]{2}\s+\d{5}(?:-\d{4})?\b").unwrap();

    /// Street-suffix words that mark address lines.
    pub static ref STREET_SUFFIX: Regex = Regex::new(
        r"(?i)\b(?:STREET|AVENUE|AVE|ROAD|RD|BLVD|BOULEVARD|DRIVE|LANE|HIGHWAY|HWY|PKWY|PARKWAY|SUITE|STE|P\.?O\.?\s+BOX)\b|\bST\.",
    )
    .unwrap();

    /// A street number at the start of an address line.
    pub static ref STREET_NUMBER: Regex =
        Regex::new(r"^\s*\d{1,5}\s+[A-Z]").unwrap();
}

/// City tokens seen in supplier remit-to blocks; used by the garbage filter.
pub const CITY_TOKENS: &[&str] = &[
    "POCOMOKE CITY",
    "BALTIMORE",
    "SALISBURY",
    "RICHMOND",
    "CHARLOTTE",
    "COLUMBIA",
    "JACKSONVILLE",
    "CINCINNATI",
    "HOUSTON",
    "ROSEMONT",
];

/// Unit-of-measure tokens accepted next to quantities.
pub const UNIT_TOKENS: &[&str] = &[
    "CS", "EA", "LB", "GAL", "CT", "DOZ", "PK", "BX", "CA", "DZ", "PC", "QT", "PT", "OZ",
];

/// Whether a captured unit token is a known unit of measure.
pub fn is_unit_token(token: &str) -> bool {
    UNIT_TOKENS.iter().any(|u| u.eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_usd_line_matches() {
        let caps = TOTAL_USD_LINE.captures("TOTAL USD 1998.14").unwrap();
        assert_eq!(&caps[1], "1998.14");
        let caps = TOTAL_USD_LINE.captures("INVOICE TOTAL: $2,450.00").unwrap();
        assert_eq!(&caps[1], "2,450.00");
    }

    #[test]
    fn test_total_usd_line_rejects_plain_total() {
        assert!(TOTAL_USD_LINE.captures("TOTAL 1998.14").is_none());
        assert!(TOTAL_USD_LINE.captures("SUBTOTAL 1867.42").is_none());
    }

    #[test]
    fn test_subtotal_line_matches_and_bare_total_overlaps() {
        assert!(SUBTOTAL_LINE.is_match("SUBTOTAL 1867.42"));
        assert!(SUBTOTAL_LINE.is_match("SUB TOTAL: 1867.42"));
        // BARE_TOTAL also hits SUBTOTAL text; the extractor must consult
        // SUBTOTAL_LINE first.
        assert!(BARE_TOTAL_LINE.is_match("SUBTOTAL 1867.42"));
    }

    #[test]
    fn test_label_only_lines() {
        assert!(TOTAL_LABEL_ONLY.is_match("TOTAL USD"));
        assert!(TOTAL_LABEL_ONLY.is_match("  AMOUNT DUE:"));
        assert!(!TOTAL_LABEL_ONLY.is_match("TOTAL USD 1998.14"));
        assert!(SUBTOTAL_LABEL_ONLY.is_match("SUBTOTAL"));
        assert!(TAX_LABEL_ONLY.is_match("SALES TAX"));
        assert!(!TAX_LABEL_ONLY.is_match("SALES TAX 130.72"));
    }

    #[test]
    fn test_horizontal_totals_header() {
        assert!(HORIZONTAL_TOTALS_HEADER.is_match("SUBTOTAL SALES TAX TOTAL USD"));
        assert!(!HORIZONTAL_TOTALS_HEADER.is_match("SUBTOTAL SALES TAX"));
    }

    #[test]
    fn test_group_context() {
        assert!(GROUP_CONTEXT.is_match("GROUP TOTAL 500.00"));
        assert!(GROUP_CONTEXT.is_match("**** DEPT 12"));
        assert!(!GROUP_CONTEXT.is_match("TOTAL USD 1998.14"));
    }

    #[test]
    fn test_item_qty_sku_desc_rule() {
        let caps = ITEM_QTY_SKU_DESC_PRICE_EXT
            .captures("5 CS 1234567 CHICKEN BREAST 6/10 LB 45.99 229.95")
            .unwrap();
        assert_eq!(&caps[1], "5");
        assert_eq!(&caps[2], "CS");
        assert_eq!(&caps[3], "1234567");
        assert_eq!(&caps[5], "45.99");
        assert_eq!(&caps[6], "229.95");
    }

    #[test]
    fn test_item_desc_price_rule() {
        let caps = ITEM_DESC_PRICE.captures("SHOP TOWELS 14.75").unwrap();
        assert_eq!(&caps[1], "SHOP TOWELS");
        assert_eq!(&caps[2], "14.75");
    }

    #[test]
    fn test_item_desc_price_rejects_bare_money() {
        assert!(ITEM_DESC_PRICE.captures("1998.14").is_none());
    }

    #[test]
    fn test_leading_qty() {
        let caps = LEADING_QTY.captures("C 13 UNIFORM PANTS").unwrap();
        assert_eq!(caps.get(1).map(|m| m.as_str()), Some("C"));
        assert_eq!(&caps[2], "13");

        let caps = LEADING_QTY.captures("5 CS 1234567 CHICKEN").unwrap();
        assert_eq!(caps.get(1), None);
        assert_eq!(&caps[2], "5");
        assert_eq!(caps.get(3).map(|m| m.as_str()), Some("CS"));
    }

    #[test]
    fn test_leading_qty_rejects_sku() {
        assert!(LEADING_QTY.captures("1234567 CHICKEN").is_none());
    }

    #[test]
    fn test_value_only_line() {
        assert!(VALUE_ONLY_LINE.is_match("1998.14"));
        assert!(VALUE_ONLY_LINE.is_match("  $1,998.14  "));
        assert!(!VALUE_ONLY_LINE.is_match("1998.14 130.72"));
    }

    #[test]
    fn test_three_value_line() {
        let caps = THREE_VALUE_LINE.captures("1867.42 130.72 1998.14").unwrap();
        assert_eq!(&caps[1], "1867.42");
        assert_eq!(&caps[2], "130.72");
        assert_eq!(&caps[3], "1998.14");
    }

    #[test]
    fn test_fee_and_credit_labels() {
        assert!(FEE_LABEL.is_match("FUEL SURCHARGE 12.50"));
        assert!(FEE_LABEL.is_match("Environmental Fee"));
        assert!(CREDIT_LABEL.is_match("VOLUME DISCOUNT -25.00"));
        assert!(!FEE_LABEL.is_match("CHICKEN BREAST"));
    }

    #[test]
    fn test_state_zip_and_street() {
        assert!(STATE_ZIP.is_match("POCOMOKE CITY MD 21851"));
        assert!(STREET_SUFFIX.is_match("1245 INDUSTRIAL BLVD"));
        assert!(!STATE_ZIP.is_match("CHICKEN 45.99"));
    }

    #[test]
    fn test_pack_size() {
        let caps = PACK_SIZE.captures("CHICKEN 6/10 LB").unwrap();
        assert_eq!(&caps[1], "6");
        assert_eq!(&caps[2], "10");
        assert_eq!(&caps[3], "LB");
    }

    #[test]
    fn test_invoice_number_rule() {
        let caps = INVOICE_NUMBER.captures("INVOICE # 40251883").unwrap();
        assert_eq!(&caps[1], "40251883");
        let caps = INVOICE_NUMBER.captures("INVOICE NO: INV-2024-0117").unwrap();
        assert_eq!(&caps[1], "INV-2024-0117");
    }

    #[test]
    fn test_date_rules() {
        assert!(DATE_MDY.is_match("01/15/2024"));
        assert!(DATE_LONG.is_match("JAN 15, 2024"));
        assert!(DATE_LONG.is_match("January 15 2024"));
    }
}

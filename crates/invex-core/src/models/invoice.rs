//! Parsed-invoice data models.
//!
//! All monetary amounts are integer cents. Unit prices additionally carry a
//! three-decimal dollar value because several supplier layouts print per-case
//! prices like `12.375`; line math is computed from the dollar value and
//! rounded once.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Monetary amount in integer cents.
pub type Cents = i64;

/// Machine identifier for a known vendor layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKey {
    /// Cintas uniform/facility services layout.
    Cintas,
    /// Sysco foodservice layout.
    Sysco,
    /// US Foods layout.
    Usfoods,
    /// No specific vendor detected; generic strategies only.
    Generic,
    /// Vendor not evaluated (failed parses).
    Unknown,
}

impl VendorKey {
    /// Stable string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorKey::Cintas => "cintas",
            VendorKey::Sysco => "sysco",
            VendorKey::Usfoods => "usfoods",
            VendorKey::Generic => "generic",
            VendorKey::Unknown => "unknown",
        }
    }

    /// Human-readable vendor name.
    pub fn display_name(&self) -> &'static str {
        match self {
            VendorKey::Cintas => "Cintas Corporation",
            VendorKey::Sysco => "Sysco",
            VendorKey::Usfoods => "US Foods",
            VendorKey::Generic => "Generic Vendor",
            VendorKey::Unknown => "Unknown",
        }
    }

    /// Parse a vendor key from its string form. Unknown strings are rejected
    /// rather than mapped to a default.
    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cintas" => Some(VendorKey::Cintas),
            "sysco" => Some(VendorKey::Sysco),
            "usfoods" | "us_foods" | "us foods" => Some(VendorKey::Usfoods),
            "generic" => Some(VendorKey::Generic),
            "unknown" => Some(VendorKey::Unknown),
            _ => None,
        }
    }

    /// Whether this key names a vendor with a specialized parser.
    pub fn is_specific(&self) -> bool {
        matches!(self, VendorKey::Cintas | VendorKey::Sysco | VendorKey::Usfoods)
    }
}

/// Outcome of vendor detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorIdentity {
    /// Detected vendor key.
    pub key: VendorKey,

    /// Display name for the detected vendor.
    pub display_name: String,

    /// Detection confidence (0-100).
    pub confidence: u8,
}

impl VendorIdentity {
    pub fn new(key: VendorKey, confidence: u8) -> Self {
        Self {
            key,
            display_name: key.display_name().to_string(),
            confidence,
        }
    }

    /// Identity for texts where no vendor was evaluated.
    pub fn unknown() -> Self {
        Self::new(VendorKey::Unknown, 0)
    }
}

/// A unit price carrying both display cents and the three-decimal dollar
/// value some layouts print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPrice {
    /// Price in dollars, up to three decimals.
    pub dollars: f64,

    /// Price rounded to integer cents for display.
    pub cents: Cents,
}

impl UnitPrice {
    pub fn from_cents(cents: Cents) -> Self {
        Self {
            dollars: cents as f64 / 100.0,
            cents,
        }
    }

    pub fn from_dollars(dollars: f64) -> Self {
        Self {
            dollars,
            cents: (dollars * 100.0).round() as Cents,
        }
    }

    /// Extend this unit price over a quantity, rounding once at the end.
    pub fn extend(&self, quantity: i64) -> Cents {
        (self.dollars * quantity as f64 * 100.0).round() as Cents
    }
}

/// A single billable product/service row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// 1-based position in the emitted item list.
    pub line_number: u32,

    /// Product code when one was recognized on the row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Product/service description. Always at least 3 characters.
    pub description: String,

    /// Billed quantity, at least 1.
    pub quantity: i64,

    /// Unit price in cents.
    pub unit_price_cents: Cents,

    /// Unit price with three-decimal precision. Not part of the envelope.
    #[serde(skip)]
    pub unit_price: UnitPrice,

    /// Extended line total in cents.
    pub line_total_cents: Cents,

    /// Whether the row is subject to sales tax.
    pub taxable: bool,

    /// Row category as printed by the vendor (e.g. a garment class code).
    pub category: String,

    /// Whether `quantity * unit_price` reconciled against `line_total`.
    pub math_validated: bool,

    /// Whether the quantity was replaced to close the row arithmetic.
    pub math_corrected: bool,

    /// Original quantity before a math correction. Absent when no correction
    /// was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_qty: Option<i64>,

    /// Coarse product bucket derived from the description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_category: Option<String>,

    /// Unit-of-measure token found on the row (CS, EA, LB, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_units: Option<String>,

    /// Pricing basis for the row (per-case, per-pound, each).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<String>,

    /// Index into the normalized text this row came from.
    #[serde(skip)]
    pub source_line_index: usize,

    /// Name of the strategy that produced this row.
    #[serde(skip)]
    pub parse_strategy: String,
}

impl LineItem {
    /// A row with the mandatory fields set and everything else defaulted.
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: UnitPrice, line_total_cents: Cents) -> Self {
        Self {
            line_number: 0,
            sku: None,
            description: description.into(),
            quantity,
            unit_price_cents: unit_price.cents,
            unit_price,
            line_total_cents,
            taxable: true,
            category: String::new(),
            math_validated: false,
            math_corrected: false,
            original_qty: None,
            product_category: None,
            detected_units: None,
            pricing_type: None,
            source_line_index: 0,
            parse_strategy: String::new(),
        }
    }
}

/// Kind of a monetary adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    /// A surcharge or service fee; always positive.
    Fee,
    /// A discount, rebate or return; always negative.
    Credit,
    /// A tax amount surfaced as an adjustment.
    Tax,
    /// Introduced by the reconciler to close a residual.
    Synthetic,
}

/// A signed monetary event outside the item list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    /// 1-based position in the emitted adjustment list.
    pub adjustment_number: u32,

    /// Adjustment kind.
    pub kind: AdjustmentKind,

    /// Printed label, or `Reconciliation residual` for synthetic entries.
    pub description: String,

    /// Signed amount in cents. Credits are negative.
    pub amount_cents: Cents,

    /// Source text the adjustment was extracted from.
    #[serde(skip)]
    pub raw: String,

    /// True only for reconciler-introduced entries.
    pub is_synthetic: bool,
}

/// Invoice-level monetary summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Items subtotal in cents.
    pub subtotal_cents: Cents,

    /// Sales tax in cents.
    pub tax_cents: Cents,

    /// Sum of all adjustment amounts in cents (signed).
    pub adjustments_cents: Cents,

    /// The authoritative invoice total the reconciler committed to.
    pub total_cents: Cents,

    /// Total as printed on the document. Absent when no printed total was
    /// found, in which case the computed total is authoritative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_total_cents: Option<Cents>,

    /// `items + tax + adjustments`, before reconciliation.
    pub computed_total_cents: Cents,

    /// ISO currency code. Single dominant currency per invoice.
    pub currency: String,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            subtotal_cents: 0,
            tax_cents: 0,
            adjustments_cents: 0,
            total_cents: 0,
            printed_total_cents: None,
            computed_total_cents: 0,
            currency: "USD".to_string(),
        }
    }
}

/// Header metadata extracted from the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_to: Option<String>,
}

impl InvoiceHeader {
    /// Number of populated header fields that count toward validation
    /// (invoice number, date, vendor is scored separately, customer).
    pub fn completeness(&self) -> usize {
        [
            self.invoice_number.is_some(),
            self.invoice_date.is_some(),
            self.customer_name.is_some() || self.sold_to.is_some(),
            self.account_number.is_some(),
        ]
        .iter()
        .filter(|&&v| v)
        .count()
    }
}

/// Score breakdown for a validated parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Printed-total sanity (max 35).
    pub printed_total_score: i32,

    /// Items-sum reconciliation (max 25).
    pub items_sum_score: i32,

    /// Adjustments/tax plausibility (max 15).
    pub adjustments_score: i32,

    /// Header completeness (max 10).
    pub header_score: i32,

    /// Fraction of items passing math validation (max 15).
    pub line_item_quality_score: i32,

    /// Sum of applied penalties, as a positive number.
    pub penalties: i32,

    /// Free-form evidence for each scored aspect. Ordered so serialized
    /// results stay byte-identical across runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

/// Validation outcome and confidence for a parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Final score (0-100).
    pub score: u8,

    /// Hard anomalies. Non-empty implies `is_valid == false`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,

    /// Soft anomalies that do not invalidate the parse.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Whether the parse passed validation without hard anomalies.
    pub is_valid: bool,

    /// Per-aspect breakdown of the score.
    pub breakdown: ScoreBreakdown,
}

/// Terminal failure kinds. Soft problems are reported through
/// [`ValidationReport`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
    /// The input text was empty or whitespace.
    EmptyInput,
    /// No strategy produced items or a total.
    NoValidParse,
}

/// Debug evidence attached to a result when requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    /// The raw input text, for re-parse checks.
    pub original_text: String,

    /// Document quality score (0-100) after normalization.
    pub text_quality: u8,

    /// Quality bucket label (poor/fair/good).
    pub quality_bucket: String,

    /// Vendor detection outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_detection: Option<VendorIdentity>,

    /// Score of every candidate considered by the chooser.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateScore>,

    /// Ranked totals candidates the extractor produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub total_candidates: Vec<TotalCandidateEvidence>,

    /// Step-by-step reconciliation trace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reconciliation: Vec<String>,

    /// Descriptions removed by the final garbage filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filtered_items: Vec<String>,

    /// Structural fingerprint used for the pattern store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// One candidate's score as seen by the chooser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    /// Strategy name.
    pub strategy: String,

    /// Vendor the strategy parsed as.
    pub vendor: VendorKey,

    /// Number of items the candidate extracted.
    pub item_count: usize,

    /// Final validator score including bonuses and penalties.
    pub score: i32,

    /// The candidate's view of the invoice total, in cents.
    pub total_cents: Cents,
}

/// Totals-extractor evidence carried into the debug block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCandidateEvidence {
    pub label: String,
    pub value_cents: Cents,
    pub priority: u8,
    pub layout: String,
    pub context: String,
}

/// The terminal entity emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    /// False only for the terminal failures in [`ParseFailure`].
    pub success: bool,

    /// Terminal failure kind when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseFailure>,

    /// Detected (or forced) vendor key.
    pub vendor_key: VendorKey,

    /// Display name for the vendor.
    pub vendor_name: String,

    /// Engine version that produced this result.
    pub parser_version: String,

    /// Header metadata, flattened into the envelope.
    #[serde(flatten)]
    pub header: InvoiceHeader,

    /// Monetary summary with the authoritative total.
    pub totals: Totals,

    /// Extracted and synthetic adjustments.
    pub adjustments: Vec<Adjustment>,

    /// Filtered line items.
    pub line_items: Vec<LineItem>,

    /// Validation score, issues and warnings.
    pub confidence: ValidationReport,

    /// Opaque debug block, present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugReport>,
}

impl ParseResult {
    /// A failure envelope with zeroed totals and empty arrays.
    pub fn failure(error: ParseFailure, parser_version: &str) -> Self {
        Self {
            success: false,
            error: Some(error),
            vendor_key: VendorKey::Unknown,
            vendor_name: VendorKey::Unknown.display_name().to_string(),
            parser_version: parser_version.to_string(),
            header: InvoiceHeader::default(),
            totals: Totals::default(),
            adjustments: Vec::new(),
            line_items: Vec::new(),
            confidence: ValidationReport::default(),
            debug: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vendor_key_roundtrip() {
        for key in [
            VendorKey::Cintas,
            VendorKey::Sysco,
            VendorKey::Usfoods,
            VendorKey::Generic,
            VendorKey::Unknown,
        ] {
            assert_eq!(VendorKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(VendorKey::from_key("acme"), None);
    }

    #[test]
    fn test_unit_price_three_decimal_extension() {
        // 24 cases at $12.375 is $297.00, not $297.12 (24 * 1238).
        let price = UnitPrice::from_dollars(12.375);
        assert_eq!(price.cents, 1238);
        assert_eq!(price.extend(24), 29700);
    }

    #[test]
    fn test_unit_price_from_cents() {
        let price = UnitPrice::from_cents(4599);
        assert_eq!(price.extend(2), 9198);
    }

    #[test]
    fn test_envelope_serialization_shape() {
        let result = ParseResult::failure(ParseFailure::EmptyInput, "invex-core/0.1.0");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "empty_input");
        assert_eq!(json["vendorKey"], "unknown");
        assert_eq!(json["totals"]["totalCents"], 0);
        // Absent optionals stay out of the envelope entirely.
        assert!(json.get("invoiceNumber").is_none());
        assert!(json.get("debug").is_none());
    }

    #[test]
    fn test_header_completeness() {
        let mut header = InvoiceHeader::default();
        assert_eq!(header.completeness(), 0);
        header.invoice_number = Some("INV-1001".to_string());
        header.customer_name = Some("POCOMOKE DINER".to_string());
        assert_eq!(header.completeness(), 2);
    }
}

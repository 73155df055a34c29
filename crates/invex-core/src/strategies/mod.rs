//! Competing parser strategies.
//!
//! Every strategy consumes the same context and emits the same candidate
//! shape; the validator scores them and the chooser keeps one. A strategy
//! that fails internally contributes no candidate and the pipeline moves on.

mod cintas;
mod delimited;
mod header_guided;
mod heuristic;
mod price_anchored;
mod sysco;
mod universal;
mod usfoods;

pub use cintas::CintasParser;
pub use delimited::DelimitedParser;
pub use header_guided::HeaderGuidedParser;
pub use heuristic::HeuristicParser;
pub use price_anchored::PriceAnchoredParser;
pub use sysco::SyscoParser;
pub use universal::UniversalPatternParser;
pub use usfoods::UsFoodsParser;

use crate::models::invoice::{
    Adjustment, Cents, InvoiceHeader, LineItem, VendorIdentity, VendorKey,
};
use crate::rules::numbers::validate_and_repair;
use crate::rules::patterns::{
    BARE_TOTAL_LINE, CREDIT_LABEL, FEE_LABEL, SUBTOTAL_LINE, TAX_LABEL_ONLY, TAX_LINE,
    TOTAL_LABEL_ONLY,
};
use crate::rules::totals::{TotalLabel, TotalsEvidence};
use crate::text::{InvoiceText, MergedLine};
use crate::rules::layout::TableLayout;

/// Everything a strategy may consult. All references are read-only; each
/// candidate owns its own output arrays.
pub struct ParseContext<'a> {
    pub text: &'a InvoiceText,
    pub merged: &'a [MergedLine],
    pub vendor: &'a VendorIdentity,
    pub header: &'a InvoiceHeader,
    pub layout: Option<&'a TableLayout>,
    pub totals: &'a TotalsEvidence,
    pub adjustments: &'a [Adjustment],
}

/// One parser's attempt at a full invoice result.
#[derive(Debug, Clone)]
pub struct ParseCandidate {
    pub vendor: VendorKey,
    pub strategy: &'static str,
    /// Attempt order, for deterministic tie-breaking.
    pub strategy_rank: usize,
    pub header: InvoiceHeader,
    pub items: Vec<LineItem>,
    pub adjustments: Vec<Adjustment>,
    pub subtotal_cents: Option<Cents>,
    pub tax_cents: Option<Cents>,
    pub printed_total_cents: Option<Cents>,
    /// Strategy self-score (0-100).
    pub confidence: u8,
    pub raw_line_count: usize,
    /// Validator score; meaningful only after validation.
    pub score: i32,
}

impl ParseCandidate {
    pub fn items_sum(&self) -> Cents {
        self.items.iter().map(|i| i.line_total_cents).sum()
    }

    pub fn is_vendor_specific(&self) -> bool {
        self.vendor.is_specific()
    }
}

/// A parsing strategy.
pub trait ParseStrategy {
    fn name(&self) -> &'static str;

    /// The vendor this strategy is specialized for, if any.
    fn vendor(&self) -> Option<VendorKey> {
        None
    }

    fn run(&self, ctx: &ParseContext<'_>) -> Option<ParseCandidate>;
}

/// Whether a line belongs to the totals/adjustments region rather than the
/// item table. `TOTAL CASE` products are the one allowed TOTAL phrase.
pub fn is_summary_line(line: &str) -> bool {
    let upper = line.to_uppercase();
    if upper.contains("TOTAL CASE") {
        return false;
    }
    SUBTOTAL_LINE.is_match(line)
        || TAX_LINE.is_match(line)
        || TAX_LABEL_ONLY.is_match(line)
        || TOTAL_LABEL_ONLY.is_match(line)
        || BARE_TOTAL_LINE.is_match(line)
        || FEE_LABEL.is_match(line)
        || CREDIT_LABEL.is_match(line)
}

/// Strip trailing SKU-shaped tokens and stray separators off a description.
pub fn clean_description(raw: &str) -> String {
    let mut description = raw.trim().trim_matches(|c: char| c == '|' || c == '\t').trim().to_string();
    loop {
        let trimmed = description.trim_end();
        let Some(last) = trimmed.split_whitespace().last() else {
            break;
        };
        let is_sku_shaped =
            (5..=12).contains(&last.len()) && last.chars().all(|c| c.is_ascii_digit());
        if is_sku_shaped {
            description = trimmed[..trimmed.len() - last.len()].trim_end().to_string();
        } else {
            break;
        }
    }
    description
}

/// Trailing `Y`/`N` taxable flag some layouts print after the amount.
pub fn taxable_flag(line: &str) -> Option<bool> {
    match line.trim_end().rsplit(' ').next() {
        Some("Y") => Some(true),
        Some("N") => Some(false),
        _ => None,
    }
}

const FOOD_WORDS: &[&str] = &[
    "CHICKEN", "BEEF", "PORK", "TURKEY", "FISH", "SHRIMP", "RICE", "FLOUR", "CHEESE", "MILK",
    "CREAM", "BREAD", "EGG", "TOMATO", "LETTUCE", "ONION", "POTATO", "FRIES", "OIL", "SAUCE",
    "SUGAR", "BEANS",
];
const CHEMICAL_WORDS: &[&str] = &[
    "DEGREASER", "CLEANER", "SANITIZER", "BLEACH", "DETERGENT", "SOAP", "POLISH",
];
const PAPER_WORDS: &[&str] = &[
    "TOWEL", "TISSUE", "NAPKIN", "PAPER", "CUP", "PLATE", "LINER", "FILM", "FOIL", "WRAP",
];
const UNIFORM_WORDS: &[&str] = &[
    "UNIFORM", "PANTS", "SHIRT", "APRON", "MAT", "MOP", "JACKET", "COVERALL", "TOWELS",
];
const SERVICE_WORDS: &[&str] = &["SERVICE", "RENTAL", "MAINTENANCE", "LAUNDRY"];

/// Enrich a row with product category and pricing basis.
pub fn enrich_item(item: &mut LineItem) {
    let upper = item.description.to_uppercase();
    let category = if UNIFORM_WORDS.iter().any(|w| upper.contains(w)) {
        Some("uniform")
    } else if CHEMICAL_WORDS.iter().any(|w| upper.contains(w)) {
        Some("chemical")
    } else if PAPER_WORDS.iter().any(|w| upper.contains(w)) {
        Some("paper")
    } else if FOOD_WORDS.iter().any(|w| upper.contains(w)) {
        Some("food")
    } else if SERVICE_WORDS.iter().any(|w| upper.contains(w)) {
        Some("service")
    } else {
        None
    };
    if item.product_category.is_none() {
        item.product_category = category.map(str::to_string);
    }

    if item.pricing_type.is_none() {
        item.pricing_type = item.detected_units.as_deref().map(|unit| {
            match unit {
                "CS" | "CA" | "BX" => "per-case",
                "LB" => "per-pound",
                "GAL" => "per-gallon",
                _ => "each",
            }
            .to_string()
        });
    }
}

/// Finalize a strategy's raw rows: drop impossible rows, repair math,
/// enrich, and stamp provenance.
pub fn finalize_items(mut items: Vec<LineItem>, strategy: &'static str) -> Vec<LineItem> {
    items.retain(|item| {
        item.description.trim().len() >= 3 && item.quantity >= 1 && item.line_total_cents >= 0
    });
    for (index, item) in items.iter_mut().enumerate() {
        item.line_number = index as u32 + 1;
        item.parse_strategy = strategy.to_string();
        validate_and_repair(item);
        enrich_item(item);
    }
    items
}

/// Score a candidate the way strategies are compared before validation:
/// item volume, math-validation rate, and closeness to the printed total.
pub fn score_candidate(items: &[LineItem], printed_total: Option<Cents>) -> u8 {
    let mut score: i32 = 0;

    score += (items.len() as i32 * 5).min(30);

    if !items.is_empty() {
        let validated = items.iter().filter(|i| i.math_validated).count();
        score += (validated as i32 * 40) / items.len() as i32;
    }

    if let Some(total) = printed_total {
        if total > 0 {
            let sum: Cents = items.iter().map(|i| i.line_total_cents).sum();
            let diff = (sum - total).abs() as f64 / total as f64;
            if diff <= 0.02 {
                score += 20;
            } else if diff <= 0.10 {
                score += 10;
            } else if diff <= 0.25 {
                score += 5;
            }
        }
    }

    let suspicious = items.iter().filter(|i| i.quantity > 100).count();
    score -= (suspicious as i32 * 5).min(20);

    score.clamp(0, 100) as u8
}

/// Assemble a candidate from finalized rows, pulling totals evidence with
/// an optional label preference.
pub fn build_candidate(
    strategy: &'static str,
    vendor: VendorKey,
    items: Vec<LineItem>,
    ctx: &ParseContext<'_>,
    preferred_labels: &[TotalLabel],
) -> Option<ParseCandidate> {
    if items.is_empty() && ctx.totals.candidates.is_empty() {
        return None;
    }

    let printed_total_cents = preferred_labels
        .iter()
        .find_map(|wanted| {
            ctx.totals
                .candidates
                .iter()
                .find(|c| c.label == *wanted)
                .map(|c| c.value_cents)
        })
        .or_else(|| ctx.totals.best_total().map(|c| c.value_cents));

    let confidence = score_candidate(&items, printed_total_cents);

    Some(ParseCandidate {
        vendor,
        strategy,
        strategy_rank: 0,
        header: ctx.header.clone(),
        items,
        adjustments: ctx.adjustments.to_vec(),
        subtotal_cents: ctx.totals.subtotal_cents,
        tax_cents: ctx.totals.tax_cents,
        printed_total_cents,
        confidence,
        raw_line_count: ctx.text.lines.len(),
        score: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::UnitPrice;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_summary_line() {
        assert!(is_summary_line("SUBTOTAL 1867.42"));
        assert!(is_summary_line("TOTAL USD"));
        assert!(is_summary_line("FUEL SURCHARGE 12.50"));
        assert!(!is_summary_line("5 CS 1234567 CHICKEN BREAST 45.99 229.95"));
        assert!(!is_summary_line("2 TOTAL CASE HOLDER 3.00 6.00"));
    }

    #[test]
    fn test_clean_description_strips_trailing_sku() {
        assert_eq!(clean_description("CHICKEN BREAST 1234567"), "CHICKEN BREAST");
        assert_eq!(clean_description("CHICKEN 6/10 LB"), "CHICKEN 6/10 LB");
        assert_eq!(clean_description("  SHOP TOWELS  "), "SHOP TOWELS");
    }

    #[test]
    fn test_taxable_flag() {
        assert_eq!(taxable_flag("DEGREASER 22.00 44.00 Y"), Some(true));
        assert_eq!(taxable_flag("DEGREASER 22.00 44.00 N"), Some(false));
        assert_eq!(taxable_flag("DEGREASER 22.00 44.00"), None);
    }

    #[test]
    fn test_enrich_item() {
        let mut item = LineItem::new("CHICKEN BREAST", 2, UnitPrice::from_cents(4599), 9198);
        item.detected_units = Some("CS".to_string());
        enrich_item(&mut item);
        assert_eq!(item.product_category.as_deref(), Some("food"));
        assert_eq!(item.pricing_type.as_deref(), Some("per-case"));
    }

    #[test]
    fn test_finalize_drops_impossible_rows() {
        let items = vec![
            LineItem::new("OK ITEM", 1, UnitPrice::from_cents(100), 100),
            LineItem::new("X", 1, UnitPrice::from_cents(100), 100),
            LineItem::new("NEGATIVE", 1, UnitPrice::from_cents(100), -5),
        ];
        let finalized = finalize_items(items, "test");
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].line_number, 1);
        assert!(finalized[0].math_validated);
    }

    #[test]
    fn test_score_candidate_closeness_bands() {
        let items = vec![LineItem::new("GOOD ROW", 1, UnitPrice::from_cents(10_000), 10_000)];
        let items = finalize_items(items, "test");
        let tight = score_candidate(&items, Some(10_000));
        let loose = score_candidate(&items, Some(12_000));
        let none = score_candidate(&items, None);
        assert!(tight > loose);
        assert!(loose > none);
    }

    #[test]
    fn test_score_penalizes_suspicious_quantities() {
        let normal = finalize_items(
            vec![LineItem::new("ROW A", 2, UnitPrice::from_cents(100), 200)],
            "test",
        );
        let suspicious = finalize_items(
            vec![LineItem::new("ROW A", 500, UnitPrice::from_cents(100), 50_000)],
            "test",
        );
        assert!(score_candidate(&normal, None) > score_candidate(&suspicious, None));
    }
}

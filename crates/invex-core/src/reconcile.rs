//! Printed-total reconciliation.
//!
//! The printed total always wins. When the computed side (items + tax +
//! adjustments) disagrees beyond tolerance, the reconciler closes the gap
//! with a synthetic adjustment rather than silently re-deriving the total,
//! so the emitted arithmetic is auditable.

use tracing::debug;

use crate::models::invoice::{Adjustment, AdjustmentKind, Cents, Totals};
use crate::rules::format_cents;
use crate::rules::totals::{TotalLabel, TotalsEvidence};
use crate::strategies::ParseCandidate;

/// Description attached to every reconciler-introduced adjustment.
pub const RESIDUAL_DESCRIPTION: &str = "Reconciliation residual";

/// Outcome of reconciliation: the committed totals plus the audit trail.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub totals: Totals,
    pub trace: Vec<String>,
    pub warnings: Vec<String>,
}

/// Tolerance for accepting the printed total as already reconciled: the
/// greater of ten cents and half a percent.
fn tolerance(printed: Cents) -> Cents {
    10.max(printed.abs() / 200)
}

/// Reconcile the winning candidate against the totals evidence. May append
/// one synthetic adjustment to the candidate.
pub fn reconcile(
    candidate: &mut ParseCandidate,
    evidence: &TotalsEvidence,
    currency: String,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    let items_sum: Cents = candidate.items_sum();
    let tax = candidate.tax_cents.or(evidence.tax_cents).unwrap_or(0);
    let adj_sum: Cents = candidate.adjustments.iter().map(|a| a.amount_cents).sum();
    let computed = items_sum + tax + adj_sum;

    outcome.trace.push(format!(
        "items {} + tax {} + adjustments {} = computed {}",
        format_cents(items_sum),
        format_cents(tax),
        format_cents(adj_sum),
        format_cents(computed)
    ));

    let subtotal = candidate.subtotal_cents.or(evidence.subtotal_cents);
    let printed = pick_printed_total(evidence, subtotal);

    let authoritative = match printed {
        Some((value, label, layout)) => {
            outcome.trace.push(format!(
                "printed total {} from {} ({layout})",
                format_cents(value),
                label
            ));
            let residual = value - computed;
            if residual.abs() <= tolerance(value) {
                outcome
                    .trace
                    .push("printed and computed agree within tolerance".to_string());
            } else {
                let kind_word = if residual > 0 { "charge" } else { "credit" };
                outcome.trace.push(format!(
                    "residual {} closed with a synthetic {kind_word}",
                    format_cents(residual)
                ));
                candidate.adjustments.push(Adjustment {
                    adjustment_number: 0,
                    kind: AdjustmentKind::Synthetic,
                    description: RESIDUAL_DESCRIPTION.to_string(),
                    amount_cents: residual,
                    raw: String::new(),
                    is_synthetic: true,
                });
            }
            value
        }
        None => {
            outcome
                .warnings
                .push("no printed total".to_string());
            outcome.trace.push(format!(
                "no printed total; computed {} is authoritative",
                format_cents(computed)
            ));
            computed
        }
    };

    let adjustments_cents: Cents = candidate.adjustments.iter().map(|a| a.amount_cents).sum();

    outcome.totals = Totals {
        subtotal_cents: subtotal.unwrap_or(items_sum),
        tax_cents: tax,
        adjustments_cents,
        total_cents: authoritative,
        printed_total_cents: printed.map(|(value, _, _)| value),
        computed_total_cents: computed,
        currency,
    };

    debug!(
        total = outcome.totals.total_cents,
        printed = ?outcome.totals.printed_total_cents,
        computed = outcome.totals.computed_total_cents,
        "reconciled"
    );
    outcome
}

/// The highest-priority candidate consistent with `printed >= subtotal`.
/// Group-flagged candidates never reach the evidence list.
fn pick_printed_total(
    evidence: &TotalsEvidence,
    subtotal: Option<Cents>,
) -> Option<(Cents, &'static str, &'static str)> {
    evidence
        .candidates
        .iter()
        .find(|c| {
            c.label != TotalLabel::Subtotal
                && c.label != TotalLabel::GroupTotal
                && subtotal.is_none_or(|s| c.value_cents >= s)
        })
        .map(|c| (c.value_cents, c.label.as_str(), c.layout.as_str()))
}

/// Detect the dominant currency for the document.
pub fn detect_currency(normalized: &str) -> String {
    let upper = normalized.to_uppercase();
    if upper.contains("EUR") || upper.contains('€') {
        "EUR".to_string()
    } else if upper.contains("GBP") || upper.contains('£') {
        "GBP".to_string()
    } else {
        "USD".to_string()
    }
}

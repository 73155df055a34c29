//! Candidate validation and selection.
//!
//! Every candidate is scored against a weighted rubric; penalties punish
//! group-subtotal contamination and garbage rows, and a vendor-specific
//! candidate earns a bonus when detection was confident. The chooser sorts
//! by final score with a deterministic tie-break.

use std::collections::BTreeMap;

use tracing::debug;

use crate::filter::garbage_reason;
use crate::models::invoice::{
    CandidateScore, Cents, ScoreBreakdown, ValidationReport, VendorIdentity,
};
use crate::rules::format_cents;
use crate::rules::patterns::GROUP_CONTEXT;
use crate::strategies::ParseCandidate;
use crate::vendor::DETECTION_FLOOR;

/// Bonus for a confident vendor-specific parse with a non-zero total.
const VENDOR_BONUS: i32 = 10;

/// Validate one candidate, filling its score and producing the report.
pub fn validate_candidate(
    candidate: &ParseCandidate,
    detected: &VendorIdentity,
) -> (i32, ValidationReport) {
    let mut breakdown = ScoreBreakdown::default();
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let items_sum = candidate.items_sum();
    let tax = candidate.tax_cents.unwrap_or(0);
    let adj_sum: Cents = candidate.adjustments.iter().map(|a| a.amount_cents).sum();
    let computed = items_sum + tax + adj_sum;

    // Printed-total sanity (max 35): subtotal + tax against the printed
    // total.
    breakdown.printed_total_score = match candidate.printed_total_cents {
        Some(printed) if printed > 0 => {
            let subtotal = candidate.subtotal_cents.unwrap_or(items_sum);
            match band(subtotal + tax, printed) {
                Band::Tight => 35,
                Band::Close => 30,
                Band::Loose => 20,
                Band::Off => {
                    warnings.push("printed total far from subtotal plus tax".to_string());
                    5
                }
            }
        }
        Some(_) => 5,
        None => {
            issues.push("missing printed total".to_string());
            0
        }
    };

    // Items-sum reconciliation (max 25).
    let reference = candidate.subtotal_cents.or(candidate.printed_total_cents);
    breakdown.items_sum_score = match reference {
        Some(reference) if reference > 0 && !candidate.items.is_empty() => {
            match band(items_sum, reference) {
                Band::Tight => 25,
                Band::Close => 20,
                Band::Loose => 10,
                Band::Off => {
                    warnings.push(format!(
                        "item sum {} far from reference {}",
                        format_cents(items_sum),
                        format_cents(reference)
                    ));
                    5
                }
            }
        }
        _ if !candidate.items.is_empty() => 5,
        _ => 0,
    };

    // Adjustments/tax plausibility (max 15).
    breakdown.adjustments_score = match (candidate.tax_cents, candidate.subtotal_cents) {
        (Some(tax), Some(subtotal)) if subtotal > 0 => {
            let ratio = tax as f64 / subtotal as f64;
            if (0.005..=0.15).contains(&ratio) {
                15
            } else {
                warnings.push("tax outside the plausible rate band".to_string());
                5
            }
        }
        (Some(_), Some(_)) | (Some(_), None) => 10,
        (None, _) => 7,
    };

    // Header completeness (max 10): invoice number, date, vendor, customer
    // at 2.5 each.
    let mut header_fields = 0u32;
    if candidate.header.invoice_number.is_some() {
        header_fields += 1;
    }
    if candidate.header.invoice_date.is_some() {
        header_fields += 1;
    }
    if detected.key.is_specific() {
        header_fields += 1;
    }
    if candidate.header.customer_name.is_some() || candidate.header.sold_to.is_some() {
        header_fields += 1;
    }
    breakdown.header_score = ((header_fields as f32) * 2.5).round() as i32;

    // Line-item quality (max 15): fraction passing math validation.
    breakdown.line_item_quality_score = if candidate.items.is_empty() {
        0
    } else {
        let validated = candidate.items.iter().filter(|i| i.math_validated).count();
        ((validated as f32 / candidate.items.len() as f32) * 15.0).round() as i32
    };

    // Penalties.
    let mut penalties = 0i32;
    let contaminated = candidate
        .items
        .iter()
        .filter(|i| GROUP_CONTEXT.is_match(&i.description))
        .count();
    if contaminated > 0 {
        penalties += (contaminated as i32 * 8).min(25);
        issues.push(format!("{contaminated} group-subtotal rows captured as items"));
    }

    let singleton = candidate.items.len() == 1;
    let garbage = candidate
        .items
        .iter()
        .filter(|i| garbage_reason(i, candidate.printed_total_cents, singleton).is_some())
        .count();
    if garbage > 0 {
        penalties += 15;
        warnings.push(format!("{garbage} garbage rows will be filtered"));
    }

    if let Some(printed) = candidate.printed_total_cents {
        if printed > 0 && matches!(band(computed, printed), Band::Off) {
            penalties += 20;
            issues.push(format!(
                "computed total {} diverges from printed total {}",
                format_cents(computed),
                format_cents(printed)
            ));
        }
    }

    if !candidate.items.is_empty() {
        let validated = candidate.items.iter().filter(|i| i.math_validated).count();
        if candidate.items.len() >= 2 && validated * 2 < candidate.items.len() {
            issues.push("most items fail math validation".to_string());
        }
        if candidate.items.iter().any(|i| i.math_corrected) {
            warnings.push("quantity corrections were applied".to_string());
        }
    }

    breakdown.penalties = penalties;

    // Vendor bonus, gated on detection confidence so a weak fingerprint
    // cannot carry a bad specialized parse past a good generic one.
    let mut bonus = 0;
    if candidate.is_vendor_specific()
        && candidate.vendor == detected.key
        && detected.confidence >= DETECTION_FLOOR
        && (candidate.printed_total_cents.unwrap_or(0) > 0 || computed > 0)
    {
        bonus = VENDOR_BONUS;
    }

    let base = breakdown.printed_total_score
        + breakdown.items_sum_score
        + breakdown.adjustments_score
        + breakdown.header_score
        + breakdown.line_item_quality_score;
    let score = (base - penalties + bonus).clamp(0, 100);

    breakdown.details = details_map(&breakdown, bonus, items_sum, computed, candidate);

    let report = ValidationReport {
        score: score as u8,
        is_valid: issues.is_empty(),
        issues,
        warnings,
        breakdown,
    };
    (score, report)
}

enum Band {
    Tight,
    Close,
    Loose,
    Off,
}

/// Relative-difference bands shared by the rubric rows: 1%, 5%, 15%.
fn band(value: Cents, reference: Cents) -> Band {
    if reference == 0 {
        return Band::Off;
    }
    let diff = (value - reference).abs() as f64 / reference.abs() as f64;
    if diff <= 0.01 {
        Band::Tight
    } else if diff <= 0.05 {
        Band::Close
    } else if diff <= 0.15 {
        Band::Loose
    } else {
        Band::Off
    }
}

fn details_map(
    breakdown: &ScoreBreakdown,
    bonus: i32,
    items_sum: Cents,
    computed: Cents,
    candidate: &ParseCandidate,
) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert("strategy".to_string(), candidate.strategy.to_string());
    details.insert("itemsSum".to_string(), format_cents(items_sum));
    details.insert("computedTotal".to_string(), format_cents(computed));
    details.insert("vendorBonus".to_string(), bonus.to_string());
    details.insert(
        "penalties".to_string(),
        breakdown.penalties.to_string(),
    );
    if let Some(printed) = candidate.printed_total_cents {
        details.insert("printedTotal".to_string(), format_cents(printed));
    }
    details
}

/// Validate all candidates, pick the best, and expose the alternatives.
///
/// Ties break deterministically: score descending, vendor-specific before
/// generic, earlier attempt before later.
pub fn choose(
    mut candidates: Vec<ParseCandidate>,
    detected: &VendorIdentity,
) -> Option<(ParseCandidate, ValidationReport, Vec<CandidateScore>)> {
    if candidates.is_empty() {
        return None;
    }

    let mut reports: Vec<ValidationReport> = Vec::with_capacity(candidates.len());
    for candidate in candidates.iter_mut() {
        let (score, report) = validate_candidate(candidate, detected);
        candidate.score = score;
        reports.push(report);
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let ca = &candidates[a];
        let cb = &candidates[b];
        cb.score
            .cmp(&ca.score)
            .then_with(|| cb.is_vendor_specific().cmp(&ca.is_vendor_specific()))
            .then_with(|| ca.strategy_rank.cmp(&cb.strategy_rank))
    });

    let alternatives: Vec<CandidateScore> = order
        .iter()
        .map(|&i| {
            let c = &candidates[i];
            CandidateScore {
                strategy: c.strategy.to_string(),
                vendor: c.vendor,
                item_count: c.items.len(),
                score: c.score,
                total_cents: c.printed_total_cents.unwrap_or_else(|| c.items_sum()),
            }
        })
        .collect();

    let winner_index = order[0];
    debug!(
        strategy = candidates[winner_index].strategy,
        score = candidates[winner_index].score,
        "chose candidate"
    );

    let report = reports.swap_remove(winner_index);
    let winner = candidates.swap_remove(winner_index);
    Some((winner, report, alternatives))
}

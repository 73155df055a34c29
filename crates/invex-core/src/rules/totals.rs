//! Priority-ordered extraction of SUBTOTAL / TAX / TOTAL evidence.
//!
//! Printed totals appear in five layouts: same-line label+value, split-line
//! label then value, a stacked label column followed by a value column,
//! alternating label/value lines, and a horizontal header row above a value
//! row. Each layout is handled by its own named rule and the extractor emits
//! every candidate, ranked; choosing between them is the reconciler's job.

use tracing::debug;

use crate::models::invoice::Cents;
use crate::rules::parse_money_cents;
use crate::rules::patterns::{
    BARE_TOTAL_LINE, GRAND_TOTAL_LINE, GROUP_CONTEXT, HORIZONTAL_TOTALS_HEADER, MONEY_TOKEN,
    SUBTOTAL_LABEL_ONLY, SUBTOTAL_LINE, TAX_LABEL_ONLY, TAX_LINE, TAX_WORD, THREE_VALUE_LINE,
    TOTAL_DUE_LINE, TOTAL_LABEL_ONLY, TOTAL_USD_LINE, VALUE_ONLY_LINE,
};
use crate::text::InvoiceText;

/// Label class of a total candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalLabel {
    InvoiceTotal,
    TotalUsd,
    GrandTotal,
    AmountDue,
    BalanceDue,
    TotalDue,
    Subtotal,
    GroupTotal,
    Other,
}

impl TotalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalLabel::InvoiceTotal => "INVOICE_TOTAL",
            TotalLabel::TotalUsd => "TOTAL_USD",
            TotalLabel::GrandTotal => "GRAND_TOTAL",
            TotalLabel::AmountDue => "AMOUNT_DUE",
            TotalLabel::BalanceDue => "BALANCE_DUE",
            TotalLabel::TotalDue => "TOTAL_DUE",
            TotalLabel::Subtotal => "SUBTOTAL",
            TotalLabel::GroupTotal => "GROUP_TOTAL",
            TotalLabel::Other => "OTHER",
        }
    }
}

/// Layout rule that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalLayout {
    SameLine,
    SplitLine,
    StackedColumn,
    Alternating,
    HorizontalHeader,
}

impl TotalLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalLayout::SameLine => "same-line",
            TotalLayout::SplitLine => "split-line",
            TotalLayout::StackedColumn => "stacked-column",
            TotalLayout::Alternating => "alternating",
            TotalLayout::HorizontalHeader => "horizontal-header",
        }
    }
}

/// One ranked printed-total candidate.
#[derive(Debug, Clone)]
pub struct TotalCandidate {
    pub label: TotalLabel,
    pub value_cents: Cents,
    /// 1 (strongest labels) to 4 (bare TOTAL).
    pub priority: u8,
    pub context: String,
    pub score: u8,
    pub line_index: usize,
    pub layout: TotalLayout,
}

/// Everything the extractor found: subtotal, tax, and ranked total
/// candidates.
#[derive(Debug, Clone, Default)]
pub struct TotalsEvidence {
    pub subtotal_cents: Option<Cents>,
    pub subtotal_line: Option<usize>,
    pub tax_cents: Option<Cents>,
    pub tax_line: Option<usize>,
    pub candidates: Vec<TotalCandidate>,
}

impl TotalsEvidence {
    /// The highest-ranked total candidate, if any survived rejection.
    pub fn best_total(&self) -> Option<&TotalCandidate> {
        self.candidates.first()
    }
}

// A label and its value must sit within this many lines of each other.
const PAIRING_WINDOW: usize = 6;

/// Extract subtotal, tax and ranked total candidates from a document.
pub fn extract_totals(text: &InvoiceText) -> TotalsEvidence {
    let lines: Vec<String> = (0..text.lines.len()).map(|i| text.squashed(i)).collect();
    let mut evidence = TotalsEvidence::default();

    scan_same_line(&lines, &mut evidence);
    scan_label_column_layouts(&lines, &mut evidence);
    scan_horizontal_header(&lines, &mut evidence);

    rank_candidates(&mut evidence);

    debug!(
        candidates = evidence.candidates.len(),
        subtotal = ?evidence.subtotal_cents,
        tax = ?evidence.tax_cents,
        "totals evidence"
    );
    evidence
}

/// Same-line label+value rules, one pass per line.
fn scan_same_line(lines: &[String], evidence: &mut TotalsEvidence) {
    for (index, line) in lines.iter().enumerate() {
        // Group/section blocks contribute nothing, not even a subtotal.
        if group_context(lines, index) {
            continue;
        }

        if let Some(caps) = SUBTOTAL_LINE.captures(line) {
            if let Some(value) = money_capture(line, &caps) {
                // First subtotal wins; later ones are usually repeats.
                if evidence.subtotal_cents.is_none() {
                    evidence.subtotal_cents = Some(value);
                    evidence.subtotal_line = Some(index);
                }
            }
        }

        if evidence.tax_cents.is_none() && has_tax_label(line) {
            if let Some(value) = tax_value_on_line(line) {
                evidence.tax_cents = Some(value);
                evidence.tax_line = Some(index);
            }
        }

        if let Some((label, priority, value)) = find_total_on_line(line) {
            push_candidate(
                evidence,
                TotalCandidate {
                    label,
                    value_cents: value,
                    priority,
                    context: line.clone(),
                    score: layout_base_score(TotalLayout::SameLine, priority),
                    line_index: index,
                    layout: TotalLayout::SameLine,
                },
            );
        }
    }
}

fn has_tax_label(line: &str) -> bool {
    TAX_LINE.is_match(line) || TAX_LABEL_ONLY.is_match(line)
}

/// The first money token after a label that is not a percentage rate.
fn money_capture(line: &str, caps: &regex::Captures<'_>) -> Option<Cents> {
    let m = caps.get(1)?;
    if line[m.end()..].trim_start().starts_with('%') {
        return None;
    }
    parse_money_cents(m.as_str())
}

/// Tax lines may carry a rate before the amount (`SALES TAX 8.25% 130.72`);
/// take the first non-percent money token after the label.
fn tax_value_on_line(line: &str) -> Option<Cents> {
    let label_end = TAX_WORD.find(line)?.end();
    for m in MONEY_TOKEN.find_iter(&line[label_end..]) {
        let after = &line[label_end + m.end()..];
        if after.trim_start().starts_with('%') {
            continue;
        }
        return parse_money_cents(m.as_str());
    }
    None
}

/// Classify a same-line total by its strongest label. `\bTOTAL\b` cannot
/// match inside `SUBTOTAL`, so subtotals never classify as totals.
fn find_total_on_line(line: &str) -> Option<(TotalLabel, u8, Cents)> {
    let upper = line.to_uppercase();

    if let Some(caps) = TOTAL_USD_LINE.captures(line) {
        let label = if upper.contains("TOTAL USD") {
            TotalLabel::TotalUsd
        } else {
            TotalLabel::InvoiceTotal
        };
        return money_capture(line, &caps).map(|v| (label, 1, v));
    }
    if let Some(caps) = GRAND_TOTAL_LINE.captures(line) {
        let label = if upper.contains("GRAND TOTAL") {
            TotalLabel::GrandTotal
        } else if upper.contains("AMOUNT DUE") {
            TotalLabel::AmountDue
        } else {
            TotalLabel::BalanceDue
        };
        return money_capture(line, &caps).map(|v| (label, 2, v));
    }
    if let Some(caps) = TOTAL_DUE_LINE.captures(line) {
        return money_capture(line, &caps).map(|v| (TotalLabel::TotalDue, 3, v));
    }
    if let Some(caps) = BARE_TOTAL_LINE.captures(line) {
        return money_capture(line, &caps).map(|v| (TotalLabel::Other, 4, v));
    }
    None
}

/// Label kind for the column layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnLabel {
    Subtotal,
    Tax,
    Total(TotalLabel, u8),
}

fn label_only_kind(line: &str) -> Option<ColumnLabel> {
    if SUBTOTAL_LABEL_ONLY.is_match(line) {
        return Some(ColumnLabel::Subtotal);
    }
    if TAX_LABEL_ONLY.is_match(line) {
        return Some(ColumnLabel::Tax);
    }
    if TOTAL_LABEL_ONLY.is_match(line) {
        let upper = line.to_uppercase();
        let (label, priority) = if upper.contains("TOTAL USD") {
            (TotalLabel::TotalUsd, 1)
        } else if upper.contains("INVOICE TOTAL") {
            (TotalLabel::InvoiceTotal, 1)
        } else if upper.contains("GRAND TOTAL") {
            (TotalLabel::GrandTotal, 2)
        } else if upper.contains("AMOUNT DUE") {
            (TotalLabel::AmountDue, 2)
        } else if upper.contains("BALANCE DUE") {
            (TotalLabel::BalanceDue, 2)
        } else if upper.contains("TOTAL DUE") {
            (TotalLabel::TotalDue, 3)
        } else {
            (TotalLabel::Other, 4)
        };
        return Some(ColumnLabel::Total(label, priority));
    }
    None
}

/// Split-line, stacked-column and alternating layouts.
fn scan_label_column_layouts(lines: &[String], evidence: &mut TotalsEvidence) {
    let mut index = 0;
    while index < lines.len() {
        let Some(first) = label_only_kind(&lines[index]) else {
            index += 1;
            continue;
        };

        // Collect the run of consecutive label-only lines.
        let mut labels = vec![first];
        let mut cursor = index + 1;
        while cursor < lines.len() {
            match label_only_kind(&lines[cursor]) {
                Some(kind) => {
                    labels.push(kind);
                    cursor += 1;
                }
                None => break,
            }
        }

        if labels.len() >= 2 {
            // Stacked label column: the same number of value-only lines
            // follows, within the pairing window.
            let values = collect_values(lines, cursor, labels.len());
            if let Some(values) = values {
                apply_column_pairs(&labels, &values, TotalLayout::StackedColumn, evidence);
                index = cursor + labels.len();
                continue;
            }
        }

        // Split-line / alternating: single label, value on the next line.
        if let Some((value, value_line)) = next_value_line(lines, index + 1) {
            let alternating = label_only_kind(lines.get(value_line + 1).map(String::as_str).unwrap_or(""))
                .is_some();
            let layout = if alternating {
                TotalLayout::Alternating
            } else {
                TotalLayout::SplitLine
            };
            apply_column_pairs(&[first], &[(value, value_line)], layout, evidence);
            index = value_line + 1;
            continue;
        }

        index = cursor.max(index + 1);
    }
}

/// Collect exactly `count` value-only lines starting at `from`, aborting on
/// any other non-empty line or when the window closes.
fn collect_values(lines: &[String], from: usize, count: usize) -> Option<Vec<(Cents, usize)>> {
    let mut values = Vec::with_capacity(count);
    let mut cursor = from;
    while values.len() < count && cursor < lines.len() && cursor < from + count + PAIRING_WINDOW {
        let line = &lines[cursor];
        if line.trim().is_empty() {
            cursor += 1;
            continue;
        }
        let caps = VALUE_ONLY_LINE.captures(line)?;
        let value = parse_money_cents(caps.get(1).unwrap().as_str())?;
        values.push((value, cursor));
        cursor += 1;
    }
    (values.len() == count).then_some(values)
}

/// The next value-only line within the pairing window.
fn next_value_line(lines: &[String], from: usize) -> Option<(Cents, usize)> {
    for (offset, line) in lines.iter().skip(from).take(PAIRING_WINDOW).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let caps = VALUE_ONLY_LINE.captures(line)?;
        let value = parse_money_cents(caps.get(1).unwrap().as_str())?;
        return Some((value, from + offset));
    }
    None
}

fn apply_column_pairs(
    labels: &[ColumnLabel],
    values: &[(Cents, usize)],
    layout: TotalLayout,
    evidence: &mut TotalsEvidence,
) {
    for (label, (value, line_index)) in labels.iter().zip(values) {
        match label {
            ColumnLabel::Subtotal => {
                if evidence.subtotal_cents.is_none() {
                    evidence.subtotal_cents = Some(*value);
                    evidence.subtotal_line = Some(*line_index);
                }
            }
            ColumnLabel::Tax => {
                if evidence.tax_cents.is_none() {
                    evidence.tax_cents = Some(*value);
                    evidence.tax_line = Some(*line_index);
                }
            }
            ColumnLabel::Total(total_label, priority) => {
                push_candidate(
                    evidence,
                    TotalCandidate {
                        label: *total_label,
                        value_cents: *value,
                        priority: *priority,
                        context: format!("{} (value line {})", total_label.as_str(), line_index),
                        score: layout_base_score(layout, *priority),
                        line_index: *line_index,
                        layout,
                    },
                );
            }
        }
    }
}

/// `SUBTOTAL SALES TAX TOTAL USD` header with the three values beneath.
fn scan_horizontal_header(lines: &[String], evidence: &mut TotalsEvidence) {
    for (index, line) in lines.iter().enumerate() {
        let Some(caps) = HORIZONTAL_TOTALS_HEADER.captures(line) else {
            continue;
        };
        let total_label_text = caps.get(1).unwrap().as_str().to_uppercase();

        for follow in lines.iter().skip(index + 1).take(PAIRING_WINDOW) {
            if follow.trim().is_empty() {
                continue;
            }
            let Some(vals) = THREE_VALUE_LINE.captures(follow) else {
                break;
            };
            let subtotal = parse_money_cents(&vals[1]);
            let tax = parse_money_cents(&vals[2]);
            let total = parse_money_cents(&vals[3]);

            if evidence.subtotal_cents.is_none() {
                evidence.subtotal_cents = subtotal;
                evidence.subtotal_line = Some(index + 1);
            }
            if evidence.tax_cents.is_none() {
                evidence.tax_cents = tax;
                evidence.tax_line = Some(index + 1);
            }
            if let Some(total) = total {
                let (label, priority) = if total_label_text.contains("TOTAL USD") {
                    (TotalLabel::TotalUsd, 1)
                } else if total_label_text.contains("INVOICE TOTAL") {
                    (TotalLabel::InvoiceTotal, 1)
                } else {
                    (TotalLabel::Other, 4)
                };
                push_candidate(
                    evidence,
                    TotalCandidate {
                        label,
                        value_cents: total,
                        priority,
                        context: line.clone(),
                        score: layout_base_score(TotalLayout::HorizontalHeader, priority),
                        line_index: index,
                        layout: TotalLayout::HorizontalHeader,
                    },
                );
            }
            break;
        }
    }
}

fn push_candidate(evidence: &mut TotalsEvidence, candidate: TotalCandidate) {
    let duplicate = evidence.candidates.iter().any(|c| {
        c.label == candidate.label
            && c.value_cents == candidate.value_cents
            && c.line_index == candidate.line_index
    });
    if !duplicate {
        evidence.candidates.push(candidate);
    }
}

fn layout_base_score(layout: TotalLayout, priority: u8) -> u8 {
    let base: i32 = match layout {
        TotalLayout::SameLine => 90,
        TotalLayout::SplitLine | TotalLayout::StackedColumn | TotalLayout::Alternating => 85,
        TotalLayout::HorizontalHeader => 80,
    };
    (base - 10 * (priority as i32 - 1)).clamp(0, 100) as u8
}

/// Whether the line or the nearest preceding non-empty line (looking back a
/// bounded distance) marks a group subtotal.
fn group_context(lines: &[String], index: usize) -> bool {
    if GROUP_CONTEXT.is_match(&lines[index]) {
        return true;
    }
    lines[index.saturating_sub(3)..index]
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| GROUP_CONTEXT.is_match(l))
}

/// Rank candidates and enforce the subtotal-never-total guarantee.
fn rank_candidates(evidence: &mut TotalsEvidence) {
    let subtotal = evidence.subtotal_cents;

    // A bare TOTAL that merely repeats the subtotal loses to any stronger
    // candidate with a larger value.
    if let Some(sub) = subtotal {
        let has_larger_strong = evidence
            .candidates
            .iter()
            .any(|c| c.priority < 4 && c.value_cents > sub);
        if has_larger_strong {
            evidence
                .candidates
                .retain(|c| !(c.priority == 4 && c.value_cents == sub));
        }
    }

    evidence
        .candidates
        .sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.score.cmp(&a.score))
                .then(a.line_index.cmp(&b.line_index))
        });
}

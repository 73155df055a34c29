//! Property-based tests: the engine must be total, deterministic, and
//! indifferent to trailing whitespace on arbitrary input.

use invex_core::{parse, ParseOptions};
use proptest::prelude::*;

/// Lines that look vaguely like invoice content, plus pure noise.
fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        // Plausible item rows.
        (1u32..100, "[A-Z]{3,12}", "[A-Z]{3,12}", 1u64..100_000, 1u32..20).prop_map(
            |(qty, a, b, unit_cents, factor)| {
                let unit = unit_cents as f64 / 100.0;
                let total = unit * factor as f64;
                format!("{qty} {a} {b} {unit:.2} {total:.2}")
            }
        ),
        // Totals lines.
        (1u64..10_000_000).prop_map(|cents| format!("TOTAL USD {:.2}", cents as f64 / 100.0)),
        (1u64..10_000_000).prop_map(|cents| format!("SUBTOTAL {:.2}", cents as f64 / 100.0)),
        // Labels without values.
        Just("SUBTOTAL".to_string()),
        Just("SALES TAX".to_string()),
        Just("TOTAL USD".to_string()),
        // Noise.
        "[ -~]{0,60}".prop_map(|s| s),
        "[\\PC]{0,30}".prop_map(|s| s),
    ]
}

fn arb_document() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_line(), 0..25).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parse_never_panics(raw in "[\\PC\\n\\t]{0,400}") {
        let _ = parse(&raw, &ParseOptions::default());
    }

    #[test]
    fn parse_is_deterministic(raw in arb_document()) {
        let options = ParseOptions::default();
        let a = parse(&raw, &options);
        let b = parse(&raw, &options);
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn trailing_whitespace_is_invisible(raw in arb_document(), pad in "[ \\n]{0,10}") {
        let options = ParseOptions::default();
        let a = parse(&raw, &options);
        let b = parse(&format!("{raw}{pad}"), &options);
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn emitted_items_satisfy_invariants(raw in arb_document()) {
        let result = parse(&raw, &ParseOptions::default());
        for item in &result.line_items {
            prop_assert!(item.description.trim().len() >= 3);
            prop_assert!(item.quantity >= 1);
            prop_assert!(item.line_total_cents >= 0);
            let upper = item.description.to_uppercase();
            prop_assert!(!upper.contains("SUBTOTAL"));
        }
    }

    #[test]
    fn adjustments_sum_matches_totals(raw in arb_document()) {
        let result = parse(&raw, &ParseOptions::default());
        if result.success {
            let sum: i64 = result.adjustments.iter().map(|a| a.amount_cents).sum();
            prop_assert_eq!(result.totals.adjustments_cents, sum);
        }
    }

    #[test]
    fn printed_total_reconciles_when_found(raw in arb_document()) {
        let result = parse(&raw, &ParseOptions::default());
        if result.success {
            if let Some(printed) = result.totals.printed_total_cents {
                let items: i64 = result.line_items.iter().map(|i| i.line_total_cents).sum();
                let gap = (items + result.totals.tax_cents + result.totals.adjustments_cents
                    - printed)
                    .abs();
                let tolerance = 10i64.max(printed.abs() / 200);
                prop_assert!(gap <= tolerance, "gap {} tolerance {}", gap, tolerance);
                prop_assert_eq!(result.totals.total_cents, printed);
            } else {
                prop_assert_eq!(
                    result.totals.total_cents,
                    result.totals.computed_total_cents
                );
            }
        }
    }

    #[test]
    fn money_parsing_roundtrips(cents in 0i64..100_000_000) {
        let printed = format!("{}.{:02}", cents / 100, cents % 100);
        prop_assert_eq!(invex_core::rules::parse_money_cents(&printed), Some(cents));
    }
}

//! End-to-end pipeline tests over realistic invoice text.

use invex_core::{parse, AdjustmentKind, ParseOptions, VendorKey};
use pretty_assertions::assert_eq;

fn debug_options() -> ParseOptions {
    ParseOptions {
        debug: true,
        ..ParseOptions::default()
    }
}

const CINTAS_STACKED: &str = "\
CINTAS CORPORATION
NO. 2 LOC 082
INVOICE # 4025188382
INVOICE DATE: 01/15/2024
SOLD TO: POCOMOKE DINER
C 50 UNIFORM PANTS 17.00 850.00
C 30 UNIFORM SHIRTS 25.00 750.00
F 2 MAT SERVICE 133.71 267.42
SUBTOTAL
SALES TAX
TOTAL USD
1867.42
130.72
1998.14";

#[test]
fn scenario_a_stacked_label_column() {
    let result = parse(CINTAS_STACKED, &debug_options());

    assert!(result.success);
    assert_eq!(result.totals.subtotal_cents, 186_742);
    assert_eq!(result.totals.tax_cents, 13_072);
    assert_eq!(result.totals.total_cents, 199_814);
    assert_eq!(result.totals.printed_total_cents, Some(199_814));

    let debug = result.debug.unwrap();
    assert!(
        debug
            .reconciliation
            .iter()
            .any(|line| line.contains("stacked-column")),
        "reconciliation trace should name the layout: {:?}",
        debug.reconciliation
    );
}

#[test]
fn scenario_b_subtotal_total_confusion() {
    let result = parse(
        "CINTAS CORPORATION\n\
         C 50 UNIFORM PANTS 17.00 850.00\n\
         C 30 UNIFORM SHIRTS 25.00 750.00\n\
         F 2 MAT SERVICE 133.71 267.42\n\
         SUBTOTAL 1867.42\n\
         SALES TAX 130.72\n\
         TOTAL USD 1998.14",
        &ParseOptions::default(),
    );

    assert!(result.success);
    assert_eq!(result.totals.total_cents, 199_814);
    assert_ne!(result.totals.total_cents, 186_742);
    assert_eq!(result.totals.subtotal_cents, 186_742);
}

#[test]
fn scenario_c_vendor_bonus_decides() {
    // Every row parses under both the Cintas parser and the generic
    // strategies; the vendor bonus must put the Cintas candidate on top.
    let result = parse(CINTAS_STACKED, &debug_options());

    assert!(result.success);
    assert_eq!(result.vendor_key, VendorKey::Cintas);

    let debug = result.debug.unwrap();
    assert!(debug.candidates.len() > 1, "expected competing candidates");
    assert_eq!(debug.candidates[0].vendor, VendorKey::Cintas);
    let generic_best = debug
        .candidates
        .iter()
        .find(|c| c.vendor == VendorKey::Generic)
        .expect("a generic candidate should compete");
    assert!(debug.candidates[0].score >= generic_best.score);
}

#[test]
fn scenario_d_synthetic_adjustment() {
    let result = parse(
        "ACME SUPPLY CO\n\
         1 WIDGET CRATE 500.00 500.00\n\
         SALES TAX 40.00\n\
         TOTAL USD 550.00",
        &ParseOptions::default(),
    );

    assert!(result.success);
    assert_eq!(result.totals.total_cents, 55_000);

    let synthetics: Vec<_> = result.adjustments.iter().filter(|a| a.is_synthetic).collect();
    assert_eq!(synthetics.len(), 1);
    assert_eq!(synthetics[0].amount_cents, 1_000);
    assert_eq!(synthetics[0].description, "Reconciliation residual");
    assert_eq!(synthetics[0].kind, AdjustmentKind::Synthetic);
    assert_eq!(result.totals.adjustments_cents, 1_000);
}

#[test]
fn scenario_e_math_correction() {
    // 13 at $4.50 cannot make $9.00; the implied quantity 2 closes it.
    let result = parse(
        "ACME SUPPLY CO\n\
         13 DOOR MAT RENTAL 4.50 9.00\n\
         1 WIDGET CRATE 500.00 500.00\n\
         TOTAL USD 509.00",
        &ParseOptions::default(),
    );

    assert!(result.success);
    let corrected = result
        .line_items
        .iter()
        .find(|i| i.math_corrected)
        .expect("a corrected row");
    assert_eq!(corrected.quantity, 2);
    assert_eq!(corrected.original_qty, Some(13));
    assert!(corrected.math_validated);
}

#[test]
fn scenario_f_garbage_rejection() {
    let result = parse(
        "SYSCO EASTERN MARYLAND\n\
         INVOICE # 123456\n\
         5 CS 1234567 CHICKEN BREAST 45.99 229.95\n\
         2 CS 7654321 LONG GRAIN RICE 25.00 50.00\n\
         ORDER SUMMARY 12345\n\
         POCOMOKE CITY MD 21851\n\
         $\n\
         TOTAL 1998.14 Y\n\
         INVOICE TOTAL 279.95",
        &ParseOptions::default(),
    );

    assert!(result.success);
    assert_eq!(result.line_items.len(), 2);
    for item in &result.line_items {
        let upper = item.description.to_uppercase();
        assert!(!upper.contains("ORDER SUMMARY"), "{upper}");
        assert!(!upper.contains("POCOMOKE"), "{upper}");
        assert!(!upper.contains("TOTAL"), "{upper}");
        assert_ne!(item.description, "$");
    }
    assert_eq!(result.totals.total_cents, 27_995);
}

#[test]
fn line_item_invariants_hold() {
    let result = parse(CINTAS_STACKED, &ParseOptions::default());
    assert!(result.success);
    assert!(!result.line_items.is_empty());

    for item in &result.line_items {
        assert!(item.description.len() >= 3);
        assert!(item.quantity >= 1);
        assert!(item.line_total_cents >= 0);
        if item.math_validated {
            let computed = item.unit_price.extend(item.quantity);
            let tolerance = 5.max(item.line_total_cents / 100);
            assert!((computed - item.line_total_cents).abs() <= tolerance);
        }
    }
}

#[test]
fn totals_invariants_hold() {
    let result = parse(CINTAS_STACKED, &ParseOptions::default());
    assert!(result.success);

    let adj_sum: i64 = result.adjustments.iter().map(|a| a.amount_cents).sum();
    assert_eq!(result.totals.adjustments_cents, adj_sum);

    // When a printed total exists the emitted arithmetic closes on it.
    if let Some(printed) = result.totals.printed_total_cents {
        let items_sum: i64 = result.line_items.iter().map(|i| i.line_total_cents).sum();
        let gap = (items_sum + result.totals.tax_cents + adj_sum - printed).abs();
        let tolerance = 10.max(printed / 200);
        assert!(gap <= tolerance, "gap {gap} over tolerance {tolerance}");
        assert_eq!(result.totals.total_cents, printed);
    } else {
        assert_eq!(result.totals.total_cents, result.totals.computed_total_cents);
    }
}

#[test]
fn total_usd_always_wins_over_group_context() {
    let result = parse(
        "ACME SUPPLY CO\n\
         1 WIDGET CRATE 500.00 500.00\n\
         **** DEPT 12\n\
         TOTAL 900.00\n\
         TOTAL USD 500.00",
        &ParseOptions::default(),
    );
    assert!(result.success);
    assert_eq!(result.totals.total_cents, 50_000);
}

#[test]
fn header_fields_flow_to_envelope() {
    let result = parse(CINTAS_STACKED, &ParseOptions::default());
    assert_eq!(result.header.invoice_number.as_deref(), Some("4025188382"));
    assert_eq!(
        result.header.invoice_date,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
    );
    assert_eq!(result.header.sold_to.as_deref(), Some("POCOMOKE DINER"));
    assert_eq!(result.header.customer_name.as_deref(), Some("POCOMOKE DINER"));
}

#[test]
fn adjustments_extracted_and_signed() {
    let result = parse(
        "SYSCO EASTERN MARYLAND\n\
         5 CS 1234567 CHICKEN BREAST 45.99 229.95\n\
         FUEL SURCHARGE 12.50\n\
         VOLUME DISCOUNT 10.00\n\
         INVOICE TOTAL 232.45",
        &ParseOptions::default(),
    );

    assert!(result.success);
    let fee = result
        .adjustments
        .iter()
        .find(|a| a.kind == AdjustmentKind::Fee)
        .expect("fee");
    assert_eq!(fee.amount_cents, 1_250);
    let credit = result
        .adjustments
        .iter()
        .find(|a| a.kind == AdjustmentKind::Credit)
        .expect("credit");
    assert_eq!(credit.amount_cents, -1_000);

    // 229.95 + 12.50 - 10.00 = 232.45: reconciles without synthetics.
    assert_eq!(result.totals.total_cents, 23_245);
    assert!(result.adjustments.iter().all(|a| !a.is_synthetic));

    // Adjustment numbering is stable and 1-based.
    for (index, adjustment) in result.adjustments.iter().enumerate() {
        assert_eq!(adjustment.adjustment_number as usize, index + 1);
    }
}

#[test]
fn determinism_byte_identical() {
    let options = debug_options();
    let a = parse(CINTAS_STACKED, &options);
    let b = parse(CINTAS_STACKED, &options);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn trailing_whitespace_changes_nothing() {
    let options = ParseOptions::default();
    let a = parse(CINTAS_STACKED, &options);
    let with_trailing = format!("{CINTAS_STACKED}\n\n   \n");
    let b = parse(&with_trailing, &options);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn reparse_of_normalized_text_agrees() {
    let options = ParseOptions::default();
    let first = parse(CINTAS_STACKED, &options);
    let normalized = invex_core::normalize(CINTAS_STACKED).normalized;
    let second = parse(&normalized, &options);
    assert_eq!(first.totals.total_cents, second.totals.total_cents);
    assert_eq!(first.line_items.len(), second.line_items.len());
    assert_eq!(first.vendor_key, second.vendor_key);
}

#[test]
fn reparse_of_debug_original_text_is_identical() {
    let options = debug_options();
    let first = parse(CINTAS_STACKED, &options);
    let original = first.debug.as_ref().unwrap().original_text.clone();
    let second = parse(&original, &options);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn ocr_damage_is_repaired() {
    // Split decimals and letter-for-digit swaps inside amounts.
    let result = parse(
        "CINTAS CORPORATION\n\
         C 50 UNIFORM PANTS 17.00 850.00\n\
         C 30 UNIFORM SHIRTS 25.00 750.00\n\
         F 2 MAT SERVICE 133.71 267.42\n\
         SUBTOTAL 1867 . 42\n\
         SALES TAX 130. 72\n\
         TOTAL USD 1998 .14",
        &ParseOptions::default(),
    );
    assert!(result.success);
    assert_eq!(result.totals.total_cents, 199_814);
    assert_eq!(result.totals.tax_cents, 13_072);
}

#[test]
fn envelope_serialization_contract() {
    let result = parse(CINTAS_STACKED, &ParseOptions::default());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["vendorKey"], "cintas");
    assert_eq!(json["invoiceNumber"], "4025188382");
    assert_eq!(json["totals"]["totalCents"], 199_814);
    assert_eq!(json["totals"]["currency"], "USD");
    assert!(json["lineItems"].as_array().is_some());
    assert!(json["confidence"]["score"].as_u64().is_some());
    // Debug stays out unless requested.
    assert!(json.get("debug").is_none());
    // Internal fields stay out of the envelope.
    assert!(json["lineItems"][0].get("sourceLineIndex").is_none());
    assert!(json["lineItems"][0].get("parseStrategy").is_none());
}

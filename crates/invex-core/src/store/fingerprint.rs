//! Structural fingerprints for invoice routing.
//!
//! A fingerprint is a 12-hex-digit hash over a sorted, pipe-joined feature
//! list: line-count bucket, character-class presence flags, header-keyword
//! presence, and vendor-name presence. Two invoices from the same vendor
//! and template fingerprint identically even when every amount differs.

use sha2::{Digest, Sha256};

use crate::rules::layout::header_keyword_count;
use crate::rules::patterns::MONEY_TOKEN;
use crate::text::InvoiceText;
use crate::vendor::VENDOR_SIGNATURES;

/// Derive the structural feature list for a document.
pub fn features(text: &InvoiceText) -> Vec<String> {
    let mut features = Vec::new();

    features.push(format!("lines:{}", line_bucket(text.lines.len())));

    let upper = text.normalized.to_uppercase();
    if MONEY_TOKEN.is_match(&text.normalized) {
        features.push("has:money".to_string());
    }
    if text.normalized.contains('$') {
        features.push("has:currency".to_string());
    }
    if text.normalized.chars().any(|c| c.is_ascii_digit()) {
        features.push("has:digits".to_string());
    }
    if text.normalized.contains('\t') || text.normalized.contains('|') {
        features.push("has:delimiters".to_string());
    }

    if text
        .lines
        .iter()
        .take(30)
        .any(|line| header_keyword_count(line) >= 3)
    {
        features.push("has:table-header".to_string());
    }

    for signature in VENDOR_SIGNATURES.iter() {
        if signature.name_tokens.iter().any(|t| upper.contains(t)) {
            features.push(format!("vendor:{}", signature.key.as_str()));
        }
    }

    features.sort();
    features
}

/// Hash a feature list into the 12-hex-digit fingerprint.
pub fn fingerprint(features: &[String]) -> String {
    let joined = features.join("|");
    let digest = Sha256::digest(joined.as_bytes());
    hex::encode(&digest[..6])
}

fn line_bucket(lines: usize) -> &'static str {
    match lines {
        0..=10 => "tiny",
        11..=30 => "small",
        31..=80 => "medium",
        81..=200 => "large",
        _ => "huge",
    }
}

//! Text-quality scoring and OCR damage repair.
//!
//! Per-line scores feed two decisions: whether to run the aggressive cleanup
//! pass (document scored `poor`), and which lines are garbage and can be
//! dropped by that pass. The analyzer also merges items that OCR split
//! across consecutive lines.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::{squash, InvoiceText};

lazy_static! {
    static ref PRICE_LIKE: Regex = Regex::new(r"\$?\d[\d,]*\.\d{2}\b").unwrap();
    static ref STARTS_NUMERIC: Regex = Regex::new(r"^[CFPD]?\s*\d").unwrap();
    static ref ENDS_WITH_PRICE: Regex = Regex::new(r"\$?\d[\d,]*\.\d{2}\s*[A-Z]?\s*$").unwrap();
    // A run of at least two characters that should all be digits; OCR letter
    // substitutions are repaired only inside these.
    static ref DIGIT_CLUSTER: Regex = Regex::new(r"[0-9OlI][0-9OlI,.]{1,}[0-9OlI]").unwrap();
}

const INVOICE_KEYWORDS: &[&str] = &[
    "INVOICE", "TOTAL", "SUBTOTAL", "TAX", "QTY", "QUANTITY", "DESCRIPTION", "AMOUNT", "PRICE",
    "ITEM", "ACCOUNT", "CUSTOMER", "DATE", "SHIP", "BILL", "SOLD",
];

/// Quality bucket for a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityBucket {
    Poor,
    Fair,
    Good,
}

impl QualityBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBucket::Poor => "poor",
            QualityBucket::Fair => "fair",
            QualityBucket::Good => "good",
        }
    }
}

/// Whole-document quality summary.
#[derive(Debug, Clone)]
pub struct DocumentQuality {
    /// Mean score of non-garbage lines (0-100).
    pub score: u8,

    /// Bucket derived from the score.
    pub bucket: QualityBucket,

    /// Per-line scores, parallel to `InvoiceText::lines`.
    pub line_scores: Vec<u8>,

    /// Number of lines classified garbage.
    pub garbage_lines: usize,
}

/// A parse-ready line: possibly several source lines merged, with the index
/// of the first source line retained.
#[derive(Debug, Clone)]
pub struct MergedLine {
    pub text: String,
    pub source_index: usize,
}

/// Scores lines, optionally repairs poor documents, and merges split items.
#[derive(Debug, Clone)]
pub struct TextQualityAnalyzer {
    garbage_threshold: u8,
}

impl TextQualityAnalyzer {
    pub fn new() -> Self {
        Self { garbage_threshold: 30 }
    }

    /// Score a single line 0-100.
    pub fn score_line(&self, line: &str) -> u8 {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return 0;
        }

        let mut score: i32 = 50;
        let len = trimmed.chars().count();

        // Length bounds.
        if (4..=160).contains(&len) {
            score += 10;
        } else if len > 300 {
            score -= 20;
        } else {
            score -= 10;
        }

        let total = len as f32;
        let alnum = trimmed.chars().filter(|c| c.is_alphanumeric()).count() as f32;
        let special = trimmed
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '.' | ',' | '$' | '-' | '/' | '#' | ':'))
            .count() as f32;

        // Alphanumeric ratio.
        let alnum_ratio = alnum / total;
        if alnum_ratio >= 0.5 {
            score += 15;
        } else if alnum_ratio < 0.2 {
            score -= 25;
        }

        // Special-character ratio.
        let special_ratio = special / total;
        if special_ratio > 0.3 {
            score -= 30;
        } else if special_ratio > 0.15 {
            score -= 10;
        }

        // Price-like pattern.
        if PRICE_LIKE.is_match(trimmed) {
            score += 15;
        }

        // Invoice keyword tokens.
        let upper = trimmed.to_uppercase();
        if INVOICE_KEYWORDS.iter().any(|k| upper.contains(k)) {
            score += 10;
        }

        // Reasonable word count.
        let words = trimmed.split_whitespace().count();
        if (2..=20).contains(&words) {
            score += 10;
        }

        score.clamp(0, 100) as u8
    }

    /// Whether a line scores below the garbage threshold.
    pub fn is_garbage(&self, line: &str) -> bool {
        self.score_line(line) < self.garbage_threshold
    }

    /// Score the whole document.
    pub fn analyze(&self, text: &InvoiceText) -> DocumentQuality {
        let line_scores: Vec<u8> = text.lines.iter().map(|l| self.score_line(l)).collect();
        let garbage_lines = line_scores
            .iter()
            .zip(&text.lines)
            .filter(|(s, l)| !l.trim().is_empty() && **s < self.garbage_threshold)
            .count();

        let kept: Vec<u8> = line_scores
            .iter()
            .zip(&text.lines)
            .filter(|(s, l)| !l.trim().is_empty() && **s >= self.garbage_threshold)
            .map(|(s, _)| *s)
            .collect();

        let score = if kept.is_empty() {
            0
        } else {
            (kept.iter().map(|&s| s as u32).sum::<u32>() / kept.len() as u32) as u8
        };

        let bucket = match score {
            0..=44 => QualityBucket::Poor,
            45..=69 => QualityBucket::Fair,
            _ => QualityBucket::Good,
        };

        debug!(score, bucket = bucket.as_str(), garbage_lines, "document quality");

        DocumentQuality {
            score,
            bucket,
            line_scores,
            garbage_lines,
        }
    }

    /// Aggressive cleanup for poor documents: drop garbage lines and apply
    /// conservative OCR substitutions inside digit clusters. Letters inside
    /// alphabetic words are never touched.
    pub fn aggressive_clean(&self, text: &InvoiceText) -> InvoiceText {
        let cleaned: Vec<String> = text
            .lines
            .iter()
            .filter(|l| l.trim().is_empty() || !self.is_garbage(l))
            .map(|l| repair_digit_clusters(l))
            .collect();

        let normalized = cleaned.iter().map(|l| squash(l)).collect::<Vec<_>>().join("\n");

        InvoiceText {
            raw: text.raw.clone(),
            normalized,
            lines: cleaned,
            page_breaks: text.page_breaks.clone(),
        }
    }

    /// Merge lines OCR split out of a single item row.
    ///
    /// A line continues the buffered row when it does not start with a
    /// number/category code and the buffered row has not yet ended with a
    /// price. A line ending with a price completes the row it belongs to and
    /// flushes the buffer.
    pub fn merge_split_items(&self, text: &InvoiceText) -> Vec<MergedLine> {
        let mut out: Vec<MergedLine> = Vec::new();
        let mut buffer: Option<MergedLine> = None;

        for (index, line) in text.lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let starts_numeric = STARTS_NUMERIC.is_match(trimmed);

            if let Some(mut buf) = buffer.take() {
                let buf_open = !ENDS_WITH_PRICE.is_match(&buf.text)
                    && STARTS_NUMERIC.is_match(buf.text.trim_start());
                if buf_open && !starts_numeric {
                    buf.text.push(' ');
                    buf.text.push_str(trimmed);
                    buffer = Some(buf);
                } else {
                    out.push(buf);
                    buffer = Some(MergedLine {
                        text: trimmed.to_string(),
                        source_index: index,
                    });
                }
            } else {
                buffer = Some(MergedLine {
                    text: trimmed.to_string(),
                    source_index: index,
                });
            }

            // A buffered row that now ends with a price is complete.
            if let Some(buf) = buffer.take() {
                if ENDS_WITH_PRICE.is_match(&buf.text) {
                    out.push(buf);
                } else {
                    buffer = Some(buf);
                }
            }
        }

        if let Some(buf) = buffer {
            out.push(buf);
        }
        out
    }
}

impl Default for TextQualityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Repair `O→0`, `l→1`, `I→1` inside digit clusters only.
fn repair_digit_clusters(line: &str) -> String {
    DIGIT_CLUSTER
        .replace_all(line, |caps: &regex::Captures<'_>| {
            let cluster = &caps[0];
            // Require at least one real digit; "Ill" or "Oil" are words.
            if !cluster.chars().any(|c| c.is_ascii_digit()) {
                return cluster.to_string();
            }
            cluster
                .chars()
                .map(|c| match c {
                    'O' => '0',
                    'l' | 'I' => '1',
                    other => other,
                })
                .collect::<String>()
        })
        .into_owned()
}

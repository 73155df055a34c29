//! Text normalization for extracted invoice text.
//!
//! Input text comes from OCR or a native PDF extractor and is frequently
//! degraded: Unicode spaces, CR line endings, digits split around decimal
//! points, headers repeated on every page. Normalization is a pure function;
//! it may never fail, and empty input yields an empty [`InvoiceText`].

pub mod quality;

use lazy_static::lazy_static;
use regex::Regex;

pub use quality::{DocumentQuality, MergedLine, QualityBucket, TextQualityAnalyzer};

lazy_static! {
    // A digit separated from its decimal point or comma by stray whitespace:
    // "1867 . 42", "1,998. 14", "1 ,998".
    static ref SPLIT_BEFORE_SEPARATOR: Regex = Regex::new(r"(\d)[ \t]+([.,])[ \t]*(\d)").unwrap();
    static ref SPLIT_AFTER_SEPARATOR: Regex = Regex::new(r"(\d)([.,])[ \t]+(\d)").unwrap();
}

/// Immutable normalized view of an invoice document.
///
/// `lines` keeps the original intra-line spacing (needed for column
/// detection); `normalized` is the space-collapsed form used by keyword and
/// pattern scans.
#[derive(Debug, Clone)]
pub struct InvoiceText {
    /// The raw text as received.
    pub raw: String,

    /// Whitespace-collapsed text, one entry per body line, joined by `\n`.
    pub normalized: String,

    /// Body lines with original spacing preserved.
    pub lines: Vec<String>,

    /// Indices into `lines` where a new page starts.
    pub page_breaks: Vec<usize>,
}

impl InvoiceText {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// A line with runs of whitespace collapsed, for pattern scans.
    pub fn squashed(&self, index: usize) -> String {
        squash(&self.lines[index])
    }
}

/// Collapse runs of whitespace in a line to single spaces.
pub fn squash(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = true;
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Normalize raw extracted text into an [`InvoiceText`].
pub fn normalize(raw: &str) -> InvoiceText {
    if raw.trim().is_empty() {
        return InvoiceText {
            raw: raw.to_string(),
            normalized: String::new(),
            lines: Vec::new(),
            page_breaks: Vec::new(),
        };
    }

    let unified = unify_characters(raw);
    let pages: Vec<Vec<String>> = unified
        .split('\u{0C}')
        .map(|page| page.lines().map(repair_numeric_splits).collect())
        .collect();

    let stripped = strip_repeated_page_furniture(pages);

    let mut lines: Vec<String> = Vec::new();
    let mut page_breaks = Vec::new();
    for (i, page) in stripped.into_iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        page_breaks.push(lines.len());
        lines.extend(page);
    }

    // Trim leading/trailing fully blank lines so trailing whitespace in the
    // input cannot change any downstream field.
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
        for b in page_breaks.iter_mut() {
            *b = b.saturating_sub(1);
        }
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let normalized = lines.iter().map(|l| squash(l)).collect::<Vec<_>>().join("\n");

    InvoiceText {
        raw: raw.to_string(),
        normalized,
        lines,
        page_breaks,
    }
}

/// Replace Unicode spaces with ASCII space and CR/CRLF with LF.
fn unify_characters(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\u{00A0}' | '\u{2000}'..='\u{200B}' | '\u{202F}' | '\u{205F}' | '\u{3000}' | '\t' => {
                out.push(' ')
            }
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Rejoin digits that OCR split around a decimal point or comma.
fn repair_numeric_splits(line: &str) -> String {
    let pass1 = SPLIT_BEFORE_SEPARATOR.replace_all(line, "$1$2$3");
    SPLIT_AFTER_SEPARATOR.replace_all(&pass1, "$1$2$3").into_owned()
}

/// Remove lines repeated verbatim on three or more pages within the first
/// and last five lines of each page.
fn strip_repeated_page_furniture(pages: Vec<Vec<String>>) -> Vec<Vec<String>> {
    if pages.len() < 3 {
        return pages;
    }

    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for page in &pages {
        let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for line in edge_lines(page) {
            let trimmed = line.trim();
            if !trimmed.is_empty() && seen.insert(trimmed) {
                *counts.entry(trimmed.to_string()).or_insert(0) += 1;
            }
        }
    }

    pages
        .into_iter()
        .map(|page| {
            let len = page.len();
            page.into_iter()
                .enumerate()
                .filter(|(i, line)| {
                    let in_edge = *i < 5 || *i + 5 >= len;
                    let repeated =
                        counts.get(line.trim()).is_some_and(|&c| c >= 3) && !line.trim().is_empty();
                    !(in_edge && repeated)
                })
                .map(|(_, line)| line)
                .collect()
        })
        .collect()
}

fn edge_lines(page: &[String]) -> impl Iterator<Item = &String> {
    let len = page.len();
    page.iter()
        .enumerate()
        .filter(move |(i, _)| *i < 5 || *i + 5 >= len)
        .map(|(_, l)| l)
}

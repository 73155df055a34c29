//! Header-field extraction: invoice number, date, customer and address
//! blocks.

use chrono::NaiveDate;

use crate::models::invoice::InvoiceHeader;
use crate::rules::patterns::{
    ACCOUNT_NUMBER, BILL_TO, CUSTOMER_NAME, DATE_LABEL, DATE_LONG, DATE_MDY, INVOICE_NUMBER,
    SHIP_TO, SOLD_TO,
};
use crate::text::InvoiceText;

// Words the labeled invoice-number rule must not capture as a number.
const NUMBER_STOPWORDS: &[&str] = &["TOTAL", "DATE", "NUMBER", "SUMMARY", "DETAIL"];

/// Extract header metadata from a document.
pub fn extract_header(text: &InvoiceText) -> InvoiceHeader {
    let lines: Vec<String> = (0..text.lines.len()).map(|i| text.squashed(i)).collect();
    let mut header = InvoiceHeader::default();

    for (index, line) in lines.iter().enumerate() {
        if header.invoice_number.is_none() {
            header.invoice_number = invoice_number_on_line(line);
        }
        if header.invoice_date.is_none() {
            header.invoice_date = labeled_date_on_line(line);
        }
        if header.account_number.is_none() {
            header.account_number = ACCOUNT_NUMBER
                .captures(line)
                .map(|c| c[1].trim().to_string());
        }
        if header.customer_name.is_none() {
            header.customer_name = CUSTOMER_NAME
                .captures(line)
                .map(|c| c[1].trim().to_string())
                .filter(|s| !s.is_empty());
        }
        if header.sold_to.is_none() {
            header.sold_to = address_block(&lines, index, &SOLD_TO);
        }
        if header.bill_to.is_none() {
            header.bill_to = address_block(&lines, index, &BILL_TO);
        }
        if header.ship_to.is_none() {
            header.ship_to = address_block(&lines, index, &SHIP_TO);
        }
    }

    // Any date in the top of the document is better than none.
    if header.invoice_date.is_none() {
        header.invoice_date = lines.iter().take(15).find_map(|l| any_date_on_line(l));
    }

    // The SOLD TO name doubles as the customer when nothing else named one.
    if header.customer_name.is_none() {
        header.customer_name = header
            .sold_to
            .as_ref()
            .and_then(|block| block.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    header
}

fn invoice_number_on_line(line: &str) -> Option<String> {
    let caps = INVOICE_NUMBER.captures(line)?;
    let value = caps[1].trim().to_string();
    let upper = value.to_uppercase();
    if NUMBER_STOPWORDS.iter().any(|w| upper == *w) {
        return None;
    }
    // A bare label word next to the capture means the rule grabbed a header
    // row ("INVOICE DATE 01/15/2024"), not a number.
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(value)
}

fn labeled_date_on_line(line: &str) -> Option<NaiveDate> {
    if !DATE_LABEL.is_match(line) {
        return None;
    }
    any_date_on_line(line)
}

fn any_date_on_line(line: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_MDY.captures(line) {
        let month: u32 = caps[1].parse().unwrap_or(0);
        let day: u32 = caps[2].parse().unwrap_or(0);
        let year = parse_year(&caps[3]);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    if let Some(caps) = DATE_LONG.captures(line) {
        let month = month_number(&caps[1]);
        let day: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// The text after an address label, joined with the next line when the
/// label line itself is empty past the label.
fn address_block(lines: &[String], index: usize, label: &regex::Regex) -> Option<String> {
    let caps = label.captures(&lines[index])?;
    let inline = caps[1].trim().to_string();
    if !inline.is_empty() {
        return Some(inline);
    }
    lines
        .get(index + 1)
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99.
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_number(abbrev: &str) -> u32 {
    match abbrev.to_uppercase().as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => 0,
    }
}

//! Vendor name extraction.

use super::patterns::DIGIT;
use super::{ExtractionMatch, FieldExtractor};

/// How many non-empty lines at the top of the receipt are considered.
const VENDOR_WINDOW: usize = 5;

/// Vendor name extractor.
///
/// The merchant name is usually printed first, above the address and phone
/// lines, so the first digit-free line near the top is taken.
pub struct VendorExtractor;

impl VendorExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VendorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VendorExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let lines: Vec<&str> = split_lines(text).collect();
        match_from_lines(&lines)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        split_lines(text)
            .filter(|l| !l.trim().is_empty())
            .take(VENDOR_WINDOW)
            .filter(|l| looks_like_name(l))
            .map(|l| ExtractionMatch::new(l.trim().to_string(), 0.7, l))
            .collect()
    }
}

/// Split on `\n`, `\r\n` and a lone `\r`. The empty pieces `\r\n` leaves
/// behind are dropped by the non-empty filter downstream.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', '\r'])
}

fn looks_like_name(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() > 2 && !DIGIT.is_match(trimmed)
}

fn match_from_lines<S: AsRef<str>>(lines: &[S]) -> Option<ExtractionMatch<String>> {
    let mut non_empty = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.trim().is_empty())
        .peekable();

    let first = *non_empty.peek()?;

    if let Some(line) = non_empty.take(VENDOR_WINDOW).find(|l| looks_like_name(l)) {
        return Some(ExtractionMatch::new(line.trim().to_string(), 0.7, line));
    }

    // Nothing name-like: any guess beats none.
    Some(ExtractionMatch::new(first.trim().to_string(), 0.2, first))
}

/// Pick the vendor from already-split lines.
pub fn vendor_from_lines<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    match_from_lines(lines).map(|m| m.value)
}

/// Extract the vendor name from receipt text.
pub fn extract_vendor(text: &str) -> Option<String> {
    VendorExtractor::new().extract(text).map(|m| m.value)
}

//! Date extraction for receipts.

use chrono::NaiveDate;

use super::patterns::DATE_CANDIDATE;
use super::{ExtractionMatch, FieldExtractor};

/// Formats tried in order against a date candidate.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Date field extractor.
///
/// Values are `YYYY-MM-DD` when the candidate parses. A candidate that looks
/// like a date but does not parse is kept verbatim with a lower confidence.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        DATE_CANDIDATE.find(text).map(candidate_match)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_CANDIDATE.find_iter(text).map(candidate_match).collect()
    }
}

fn candidate_match(m: regex::Match<'_>) -> ExtractionMatch<String> {
    let raw = m.as_str();
    let found = match parse_receipt_date(raw) {
        Some(date) => ExtractionMatch::new(date.format("%Y-%m-%d").to_string(), 0.9, raw),
        None => ExtractionMatch::new(raw.to_string(), 0.4, raw),
    };
    found.with_position(m.start(), m.end())
}

/// Parse a date candidate against the supported formats.
pub fn parse_receipt_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Extract the first date on the receipt.
pub fn extract_date(text: &str) -> Option<String> {
    DateExtractor::new().extract(text).map(|m| m.value)
}

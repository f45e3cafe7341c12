//! Total and tax amount extraction.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::patterns::{DECIMAL_AMOUNT, TAX_LABELED, TOTAL_LABELED};
use super::{ExtractionMatch, FieldExtractor};

/// Labeled amount extractor.
///
/// The last labeled match in the text wins, since receipts restate the
/// total after subtotals. The total extractor additionally falls back to the
/// largest two-decimal number when no label is present.
pub struct AmountExtractor {
    pattern: &'static Regex,
    largest_fallback: bool,
}

impl AmountExtractor {
    /// Extractor for the grand total.
    pub fn total() -> Self {
        Self {
            pattern: &TOTAL_LABELED,
            largest_fallback: true,
        }
    }

    /// Extractor for the tax amount.
    pub fn tax() -> Self {
        Self {
            pattern: &TAX_LABELED,
            largest_fallback: false,
        }
    }

    fn largest_amount(&self, text: &str) -> Option<ExtractionMatch<Decimal>> {
        DECIMAL_AMOUNT
            .find_iter(text)
            .filter_map(|m| {
                let amount = Decimal::from_str(m.as_str()).ok()?;
                Some(ExtractionMatch::new(amount, 0.5, m.as_str()).with_position(m.start(), m.end()))
            })
            .max_by(|a, b| a.value.cmp(&b.value))
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        match self.extract_all(text).pop() {
            Some(labeled) => Some(labeled),
            None if self.largest_fallback => self.largest_amount(text),
            None => None,
        }
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let amount = parse_amount(&caps[2])?;
                let full_match = caps.get(0)?;
                Some(
                    ExtractionMatch::new(amount, 0.9, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

/// Extract the grand total.
pub fn extract_total(text: &str) -> Option<Decimal> {
    AmountExtractor::total().extract(text).map(|m| m.value)
}

/// Extract the tax amount.
pub fn extract_tax(text: &str) -> Option<Decimal> {
    AmountExtractor::tax().extract(text).map(|m| m.value)
}

/// Parse an amount with `,` thousands separators and `.` decimal point
/// (e.g. "1,234.56"). Sentence punctuation trailing the number is ignored.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned = s.replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    match Decimal::from_str(cleaned) {
        Ok(amount) => Some(amount),
        Err(e) => {
            debug!("Skipping amount {:?}: {}", s, e);
            None
        }
    }
}

//! Rule-based field extractors for receipt text.
//!
//! Each extractor is an independent pure function of the recognized text.
//! None of them fail: missing evidence is reported as `None`.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod patterns;
pub mod vendor;

pub use amounts::{extract_tax, extract_total, parse_amount, AmountExtractor};
pub use currency::{currency_code, extract_currency, CurrencyExtractor};
pub use dates::{extract_date, parse_receipt_date, DateExtractor};
pub use patterns::*;
pub use vendor::{extract_vendor, vendor_from_lines, VendorExtractor};

use serde::Serialize;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all candidate occurrences of the field, in document order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value together with the evidence it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte range in source text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Convert the value while keeping the evidence.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionMatch<U> {
        ExtractionMatch {
            value: f(self.value),
            confidence: self.confidence,
            position: self.position,
            source: self.source,
        }
    }
}

//! Receipt parser running every field heuristic over recognized text.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::receipt::{ParsedFields, ReceiptField};
use crate::ocr::RawText;

use super::rules::{
    AmountExtractor, CurrencyExtractor, DateExtractor, ExtractionMatch, FieldExtractor,
    VendorExtractor,
};

/// Result of receipt field extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Recovered fields.
    pub fields: ParsedFields,
    /// Evidence for each recovered field.
    pub evidence: BTreeMap<ReceiptField, ExtractionMatch<String>>,
    /// Fields that could not be recovered.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Rule-based receipt parser.
pub struct ReceiptParser {
    total: AmountExtractor,
    tax: AmountExtractor,
    date: DateExtractor,
    vendor: VendorExtractor,
    currency: CurrencyExtractor,
}

impl ReceiptParser {
    pub fn new() -> Self {
        Self {
            total: AmountExtractor::total(),
            tax: AmountExtractor::tax(),
            date: DateExtractor::new(),
            vendor: VendorExtractor::new(),
            currency: CurrencyExtractor::new(),
        }
    }

    /// Parse recognized receipt text. Never fails; fields without evidence
    /// are left as `None` and listed in the warnings.
    pub fn parse(&self, text: &RawText) -> ExtractionResult {
        self.parse_str(text.as_str())
    }

    pub fn parse_str(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut evidence = BTreeMap::new();

        info!("Parsing receipt from {} characters of text", text.len());

        let total = self.total.extract(text);
        let tax = self.tax.extract(text);
        let date = self.date.extract(text);
        let vendor = self.vendor.extract(text);
        let currency = self.currency.extract(text);

        let fields = ParsedFields {
            total_amount: record(&mut evidence, ReceiptField::TotalAmount, total),
            tax_amount: record(&mut evidence, ReceiptField::TaxAmount, tax),
            date: record(&mut evidence, ReceiptField::Date, date),
            vendor: record(&mut evidence, ReceiptField::Vendor, vendor),
            currency: record(&mut evidence, ReceiptField::Currency, currency),
        };

        let warnings: Vec<String> = [
            ReceiptField::TotalAmount,
            ReceiptField::TaxAmount,
            ReceiptField::Date,
            ReceiptField::Vendor,
            ReceiptField::Currency,
        ]
        .into_iter()
        .filter(|field| !evidence.contains_key(field))
        .map(|field| format!("Could not extract {}", field))
        .collect();

        debug!(
            "Recovered {} of 5 fields ({} warnings)",
            fields.recovered_count(),
            warnings.len()
        );

        ExtractionResult {
            fields,
            evidence,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Store the evidence for a found value and hand back the bare value.
fn record<T: ToString + Clone>(
    evidence: &mut BTreeMap<ReceiptField, ExtractionMatch<String>>,
    field: ReceiptField,
    found: Option<ExtractionMatch<T>>,
) -> Option<T> {
    let found = found?;
    let value = found.value.clone();
    evidence.insert(field, found.map(|v| v.to_string()));
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_parse_basic_receipt() {
        let text = RawText::new(
            r#"
            123 Main St
            Joe's Diner
            01/05/2024 12:31
            Burger       $8.50
            Fries        $3.00
            Subtotal:    11.50
            Tax:          0.92
            TOTAL        12.42
            Thank you
            "#,
        );

        let result = ReceiptParser::new().parse(&text);

        assert_eq!(
            result.fields,
            ParsedFields {
                total_amount: Some(Decimal::from_str("12.42").unwrap()),
                tax_amount: Some(Decimal::from_str("0.92").unwrap()),
                date: Some("2024-05-01".to_string()),
                vendor: Some("Joe's Diner".to_string()),
                currency: Some("USD".to_string()),
            }
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_dollar_sign_blocks_label_number() {
        // "Total: $12.42" has a symbol between label and number, so only the
        // subtotal line carries a labeled amount.
        let result = ReceiptParser::new().parse_str("Subtotal: 11.50\nTotal: $12.42");
        assert_eq!(result.fields.total_amount, Some(Decimal::from_str("11.50").unwrap()));
    }

    #[test]
    fn test_empty_text_yields_no_fields() {
        let result = ReceiptParser::new().parse(&RawText::default());

        assert_eq!(result.fields, ParsedFields::default());
        assert!(result.evidence.is_empty());
        assert_eq!(result.warnings.len(), 5);
    }

    #[test]
    fn test_evidence_tracks_sources() {
        let result = ReceiptParser::new().parse_str("CORNER SHOP\n2024-05-01\nTOTAL 4.20 GBP");

        let total = &result.evidence[&ReceiptField::TotalAmount];
        assert_eq!(total.value, "4.20");
        assert_eq!(total.source, "TOTAL 4.20");
        assert_eq!(result.evidence[&ReceiptField::Currency].source, "GBP");
        assert_eq!(result.warnings, vec!["Could not extract tax_amount".to_string()]);
    }

    #[test]
    fn test_garbled_text_still_returns() {
        let result = ReceiptParser::new().parse_str("~~~ ### ,,, ... \u{fffd}\u{fffd}");
        assert_eq!(result.fields.total_amount, None);
        assert_eq!(result.fields.vendor.as_deref(), Some("~~~ ### ,,, ... \u{fffd}\u{fffd}"));
    }
}

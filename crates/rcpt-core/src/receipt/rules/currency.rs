//! Currency detection.

use super::patterns::CURRENCY_MARKER;
use super::{ExtractionMatch, FieldExtractor};

/// Currency extractor: the first symbol or ISO code in the text wins.
pub struct CurrencyExtractor;

impl CurrencyExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CurrencyExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        CURRENCY_MARKER.find(text).map(marker_match)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CURRENCY_MARKER.find_iter(text).map(marker_match).collect()
    }
}

fn marker_match(m: regex::Match<'_>) -> ExtractionMatch<String> {
    ExtractionMatch::new(currency_code(m.as_str()).to_string(), 0.8, m.as_str())
        .with_position(m.start(), m.end())
}

/// Map a currency symbol to its ISO 4217 code; codes pass through unchanged.
pub fn currency_code(marker: &str) -> &str {
    match marker {
        "$" => "USD",
        "€" => "EUR",
        "£" => "GBP",
        other => other,
    }
}

/// Extract the receipt currency.
pub fn extract_currency(text: &str) -> Option<String> {
    CurrencyExtractor::new().extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!(extract_currency("Total: £12.00"), Some("GBP".to_string()));
        assert_eq!(extract_currency("Summe 9,99 €"), Some("EUR".to_string()));
        assert_eq!(extract_currency("$4.50"), Some("USD".to_string()));
    }

    #[test]
    fn test_codes_pass_through() {
        assert_eq!(extract_currency("Amount 12.00 EUR"), Some("EUR".to_string()));
        assert_eq!(extract_currency("GBP 3.20"), Some("GBP".to_string()));
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(extract_currency("Paid €5.00 (approx $5.40)"), Some("EUR".to_string()));
    }

    #[test]
    fn test_no_currency() {
        assert_eq!(extract_currency("Total 12.00"), None);
        assert_eq!(extract_currency("usd 1.00"), None);
    }

    #[test]
    fn test_match_position_uses_bytes() {
        let found = CurrencyExtractor::new().extract("ab£1").unwrap();
        assert_eq!(found.source, "£");
        assert_eq!(found.position, Some((2, 4)));
    }
}

//! Common regex patterns for receipt field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Labeled totals: "Total: 12.00", "AMOUNT DUE 1,204.50", "Grand Total 9.99"
    pub static ref TOTAL_LABELED: Regex = Regex::new(
        r"(?i)(total|amount due|grand total)[:\s]*([\d.,]+)"
    ).unwrap();

    // Labeled tax: "Tax 0.80", "VAT: 2.10"
    pub static ref TAX_LABELED: Regex = Regex::new(
        r"(?i)(tax|vat)[:\s]*([\d.,]+)"
    ).unwrap();

    // Any two-decimal number, for the unlabeled total fallback
    pub static ref DECIMAL_AMOUNT: Regex = Regex::new(
        r"[0-9]+\.[0-9]{2}"
    ).unwrap();

    // YYYY-MM-DD, YYYY/MM/DD, DD-MM-YYYY, DD/MM/YYYY, D Month YYYY
    pub static ref DATE_CANDIDATE: Regex = Regex::new(
        r"(?:\d{4}[/-]\d{2}[/-]\d{2})|(?:\d{2}[/-]\d{2}[/-]\d{4})|(?:\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4})"
    ).unwrap();

    pub static ref CURRENCY_MARKER: Regex = Regex::new(
        r"[$€£]|USD|EUR|GBP"
    ).unwrap();

    pub static ref DIGIT: Regex = Regex::new(r"\d").unwrap();
}

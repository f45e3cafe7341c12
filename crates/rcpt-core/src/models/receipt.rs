//! Receipt data models: parsed fields and the persisted receipt record.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column order of the receipt mirror file used by the persistence layer.
pub const RECEIPT_CSV_COLUMNS: [&str; 13] = [
    "id",
    "date",
    "vendor",
    "total_amount",
    "tax_amount",
    "currency",
    "payment_method",
    "category",
    "notes",
    "image_path",
    "raw_text",
    "created_at",
    "updated_at",
];

/// Fields recovered from receipt text.
///
/// Every field is independently optional. A `Some` value is always backed by
/// a match in the recognized text, never by a business default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    /// Grand total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    /// Tax / VAT amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,

    /// Purchase date as `YYYY-MM-DD`, or the raw matched text if it did not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Merchant name guess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    /// ISO 4217 currency code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl ParsedFields {
    /// Number of fields that were recovered.
    pub fn recovered_count(&self) -> usize {
        [
            self.total_amount.is_some(),
            self.tax_amount.is_some(),
            self.date.is_some(),
            self.vendor.is_some(),
            self.currency.is_some(),
        ]
        .iter()
        .filter(|found| **found)
        .count()
    }
}

/// A receipt field that can be either recovered or defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptField {
    Date,
    Vendor,
    TotalAmount,
    TaxAmount,
    Currency,
    PaymentMethod,
    Category,
    Notes,
}

impl ReceiptField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptField::Date => "date",
            ReceiptField::Vendor => "vendor",
            ReceiptField::TotalAmount => "total_amount",
            ReceiptField::TaxAmount => "tax_amount",
            ReceiptField::Currency => "currency",
            ReceiptField::PaymentMethod => "payment_method",
            ReceiptField::Category => "category",
            ReceiptField::Notes => "notes",
        }
    }
}

impl fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Found in the recognized text.
    Recovered,
    /// Filled in from the defaults policy.
    Defaulted,
}

/// A complete receipt record, ready to hand to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Unique record identifier.
    pub id: Uuid,

    /// Purchase date (`YYYY-MM-DD`, raw text, or empty when no fallback applies).
    pub date: String,

    /// Merchant name.
    pub vendor: String,

    /// Grand total.
    pub total_amount: Decimal,

    /// Tax amount.
    pub tax_amount: Decimal,

    /// Currency code.
    pub currency: String,

    /// Payment method (never extracted; caller default).
    pub payment_method: String,

    /// Spending category (never extracted; caller default).
    pub category: String,

    /// Free-form notes (never extracted; caller default).
    pub notes: String,

    /// Path of the source image.
    pub image_path: PathBuf,

    /// Text returned by the recognizer.
    pub raw_text: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Recovered/defaulted status of each populated field.
    pub provenance: BTreeMap<ReceiptField, FieldSource>,
}

impl ReceiptRecord {
    /// Fields whose value came from the defaults policy.
    pub fn defaulted_fields(&self) -> Vec<ReceiptField> {
        self.provenance
            .iter()
            .filter(|(_, source)| **source == FieldSource::Defaulted)
            .map(|(field, _)| *field)
            .collect()
    }

    /// Check whether a field was recovered from the receipt text.
    pub fn is_recovered(&self, field: ReceiptField) -> bool {
        self.provenance.get(&field) == Some(&FieldSource::Recovered)
    }

    /// Values in [`RECEIPT_CSV_COLUMNS`] order.
    pub fn csv_row(&self) -> [String; 13] {
        [
            self.id.to_string(),
            self.date.clone(),
            self.vendor.clone(),
            self.total_amount.to_string(),
            self.tax_amount.to_string(),
            self.currency.clone(),
            self.payment_method.clone(),
            self.category.clone(),
            self.notes.clone(),
            self.image_path.display().to_string(),
            self.raw_text.clone(),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_recovered_count() {
        let fields = ParsedFields {
            total_amount: Some(Decimal::from_str("9.99").unwrap()),
            vendor: Some("Corner Shop".to_string()),
            ..Default::default()
        };
        assert_eq!(fields.recovered_count(), 2);
        assert_eq!(ParsedFields::default().recovered_count(), 0);
    }

    #[test]
    fn test_provenance_serializes_with_field_names() {
        let mut provenance = BTreeMap::new();
        provenance.insert(ReceiptField::TotalAmount, FieldSource::Recovered);
        provenance.insert(ReceiptField::Currency, FieldSource::Defaulted);

        let json = serde_json::to_value(&provenance).unwrap();
        assert_eq!(json["total_amount"], "recovered");
        assert_eq!(json["currency"], "defaulted");
    }
}

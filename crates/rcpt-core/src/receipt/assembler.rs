//! Turns parsed fields into a complete receipt record.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::models::config::DefaultsConfig;
use crate::models::receipt::{FieldSource, ParsedFields, ReceiptField, ReceiptRecord};
use crate::ocr::RawText;

/// Record assembler.
///
/// Every field of the resulting record is populated. Values missing from
/// the parsed fields come from the defaults policy and are marked
/// [`FieldSource::Defaulted`] in the record's provenance.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    defaults: DefaultsConfig,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: DefaultsConfig) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    /// Assemble a record stamped with the current time.
    pub fn assemble(
        &self,
        image_path: impl Into<PathBuf>,
        raw_text: &RawText,
        fields: ParsedFields,
    ) -> ReceiptRecord {
        self.assemble_at(image_path, raw_text, fields, Utc::now())
    }

    /// Assemble a record stamped with `now`.
    pub fn assemble_at(
        &self,
        image_path: impl Into<PathBuf>,
        raw_text: &RawText,
        fields: ParsedFields,
        now: DateTime<Utc>,
    ) -> ReceiptRecord {
        let mut provenance = BTreeMap::new();
        let defaults = &self.defaults;

        let date_fallback = if defaults.date_fallback_today {
            now.date_naive().format("%Y-%m-%d").to_string()
        } else {
            String::new()
        };

        let date = pick(&mut provenance, ReceiptField::Date, fields.date, date_fallback);
        let vendor = pick(
            &mut provenance,
            ReceiptField::Vendor,
            fields.vendor,
            defaults.vendor.clone(),
        );
        let total_amount = pick(
            &mut provenance,
            ReceiptField::TotalAmount,
            fields.total_amount,
            Decimal::ZERO,
        );
        let tax_amount = pick(
            &mut provenance,
            ReceiptField::TaxAmount,
            fields.tax_amount,
            Decimal::ZERO,
        );
        let currency = pick(
            &mut provenance,
            ReceiptField::Currency,
            fields.currency,
            defaults.currency.clone(),
        );

        // Never read from the receipt.
        for field in [
            ReceiptField::PaymentMethod,
            ReceiptField::Category,
            ReceiptField::Notes,
        ] {
            provenance.insert(field, FieldSource::Defaulted);
        }

        let record = ReceiptRecord {
            id: Uuid::new_v4(),
            date,
            vendor,
            total_amount,
            tax_amount,
            currency,
            payment_method: defaults.payment_method.clone(),
            category: defaults.category.clone(),
            notes: defaults.notes.clone(),
            image_path: image_path.into(),
            raw_text: raw_text.as_str().to_string(),
            created_at: now,
            updated_at: now,
            provenance,
        };

        debug!(
            "Assembled record {} with defaulted fields {:?}",
            record.id,
            record.defaulted_fields()
        );

        record
    }
}

fn pick<T>(
    provenance: &mut BTreeMap<ReceiptField, FieldSource>,
    field: ReceiptField,
    found: Option<T>,
    fallback: T,
) -> T {
    match found {
        Some(value) => {
            provenance.insert(field, FieldSource::Recovered);
            value
        }
        None => {
            provenance.insert(field, FieldSource::Defaulted);
            fallback
        }
    }
}

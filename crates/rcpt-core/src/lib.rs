//! Core library for receipt scanning.
//!
//! This crate provides:
//! - Image normalization (grayscale, blur, Otsu binarization, deskew)
//! - A [`TextRecognizer`] seam with Tesseract and pure-onnx-ocr adapters
//! - Heuristic extraction of total, tax, date, vendor and currency
//! - Assembly of complete receipt records with per-field provenance

pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod receipt;

pub use error::{OcrError, RcptError, Result};
pub use models::config::RcptConfig;
pub use models::receipt::{FieldSource, ParsedFields, ReceiptField, ReceiptRecord};
pub use ocr::{create_recognizer, ImageNormalizer, NormalizedImage, RawText, TextRecognizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrRecognizer;
pub use ocr::TesseractRecognizer;
pub use pipeline::{create_pipeline, load_raw_image, ReceiptPipeline, ScanOutcome};
pub use receipt::{ExtractionResult, ReceiptParser, RecordAssembler};

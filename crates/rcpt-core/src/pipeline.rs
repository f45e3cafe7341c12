//! End-to-end receipt scanning: normalize, recognize, extract, assemble.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GrayImage, ImageReader};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::RcptConfig;
use crate::models::receipt::ReceiptRecord;
use crate::ocr::{create_recognizer, ImageNormalizer, RawText, TextRecognizer};
use crate::receipt::{ExtractionResult, ReceiptParser, RecordAssembler};

/// Everything produced by one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// The assembled record.
    pub record: ReceiptRecord,
    /// Field extraction details.
    pub extraction: ExtractionResult,
    /// Skew correction applied during normalization, in degrees.
    pub skew_degrees: f32,
    /// Recognizer failure, if any. The record is still produced from empty text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition_error: Option<String>,
}

/// Receipt scanning pipeline.
///
/// Scanning never fails: unreadable images, recognizer errors and text with
/// no recognizable fields all end in a fully defaulted record.
pub struct ReceiptPipeline<R> {
    normalizer: ImageNormalizer,
    recognizer: R,
    parser: ReceiptParser,
    assembler: RecordAssembler,
}

impl<R: TextRecognizer> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            normalizer: ImageNormalizer::new(),
            recognizer,
            parser: ReceiptParser::new(),
            assembler: RecordAssembler::new(),
        }
    }

    pub fn from_config(config: &RcptConfig, recognizer: R) -> Self {
        Self {
            normalizer: ImageNormalizer::from_config(&config.normalizer),
            recognizer,
            parser: ReceiptParser::new(),
            assembler: RecordAssembler::with_defaults(config.defaults.clone()),
        }
    }

    pub fn with_normalizer(mut self, normalizer: ImageNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_assembler(mut self, assembler: RecordAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Scan an image file.
    pub fn process_path(&self, path: &Path) -> ScanOutcome {
        let image = load_raw_image(path);
        self.process_image(&image, path)
    }

    /// Scan an already decoded image; `image_path` is recorded as-is.
    pub fn process_image(&self, image: &DynamicImage, image_path: &Path) -> ScanOutcome {
        let start = Instant::now();
        info!("Scanning receipt {}", image_path.display());

        let normalized = self.normalizer.normalize(image);

        let (text, recognition_error) = if normalized.is_blank() {
            debug!("Normalized image has no ink, skipping recognition");
            (RawText::default(), None)
        } else {
            match self.recognizer.recognize(&normalized.image) {
                Ok(text) => (text, None),
                Err(e) => {
                    warn!(
                        "{} failed on {}: {}",
                        self.recognizer.name(),
                        image_path.display(),
                        e
                    );
                    (RawText::default(), Some(e.to_string()))
                }
            }
        };

        self.finish(image_path, text, normalized.skew_degrees, recognition_error, start)
    }

    /// Run extraction and assembly on text that was recognized elsewhere.
    pub fn process_text(&self, text: RawText, image_path: &Path) -> ScanOutcome {
        self.finish(image_path, text, 0.0, None, Instant::now())
    }

    fn finish(
        &self,
        image_path: &Path,
        text: RawText,
        skew_degrees: f32,
        recognition_error: Option<String>,
        start: Instant,
    ) -> ScanOutcome {
        let extraction = self.parser.parse(&text);
        let record = self
            .assembler
            .assemble(image_path, &text, extraction.fields.clone());

        info!(
            "Scanned {} in {}ms ({} fields recovered)",
            image_path.display(),
            start.elapsed().as_millis(),
            extraction.fields.recovered_count()
        );

        ScanOutcome {
            record,
            extraction,
            skew_degrees,
            recognition_error,
        }
    }
}

/// Pipeline with the recognizer named in the configuration.
pub fn create_pipeline(
    config: &RcptConfig,
) -> Result<ReceiptPipeline<Box<dyn TextRecognizer>>, OcrError> {
    let recognizer = create_recognizer(&config.recognizer)?;
    Ok(ReceiptPipeline::from_config(config, recognizer))
}

/// Decode an image file. Unreadable files yield an empty image.
pub fn load_raw_image(path: &Path) -> DynamicImage {
    match decode_image(path) {
        Ok(image) => image,
        Err(e) => {
            warn!("Could not decode {}: {}", path.display(), e);
            DynamicImage::ImageLuma8(GrayImage::new(0, 0))
        }
    }
}

/// Decode by content; the extension is only a fallback hint.
fn decode_image(path: &Path) -> crate::Result<DynamicImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::ReceiptField;
    use image::{GenericImageView, Luma};
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedText {
        text: &'static str,
        calls: AtomicUsize,
    }

    impl FixedText {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextRecognizer for FixedText {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &GrayImage) -> Result<RawText, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawText::new(self.text))
        }
    }

    struct Failing;

    impl TextRecognizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _image: &GrayImage) -> Result<RawText, OcrError> {
            Err(OcrError::Recognition("engine crashed".to_string()))
        }
    }

    fn inked_image() -> DynamicImage {
        let mut image = GrayImage::from_pixel(120, 80, Luma([255]));
        for y in 30..40 {
            for x in 20..100 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        DynamicImage::ImageLuma8(image)
    }

    const RECEIPT: &str = "CORNER SHOP\n2024-05-01\nTax 0.50\nTotal 5.50 EUR";

    #[test]
    fn test_missing_file_gives_default_record() {
        let pipeline = ReceiptPipeline::new(FixedText::new(RECEIPT));
        let outcome = pipeline.process_path(Path::new("/nonexistent/receipt.png"));

        assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.record.vendor, "Unknown");
        assert_eq!(outcome.record.total_amount, Decimal::ZERO);
        assert_eq!(outcome.record.raw_text, "");
        assert_eq!(outcome.record.defaulted_fields().len(), 8);
    }

    #[test]
    fn test_misnamed_image_files_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("receipt.jpg");
        let bare = dir.path().join("capture");
        inked_image()
            .save_with_format(&jpg, image::ImageFormat::Png)
            .unwrap();
        std::fs::copy(&jpg, &bare).unwrap();

        assert_eq!(load_raw_image(&jpg).dimensions(), (120, 80));
        assert_eq!(load_raw_image(&bare).dimensions(), (120, 80));

        let pipeline = ReceiptPipeline::new(FixedText::new(RECEIPT));
        let from_jpg = pipeline.process_path(&jpg);
        let from_bare = pipeline.process_path(&bare);

        assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 2);
        assert_eq!(from_jpg.record.vendor, "CORNER SHOP");
        assert_eq!(from_bare.record.vendor, "CORNER SHOP");
    }

    #[test]
    fn test_inked_image_runs_recognizer() {
        let pipeline = ReceiptPipeline::new(FixedText::new(RECEIPT));
        let outcome = pipeline.process_image(&inked_image(), Path::new("shop.png"));

        assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.record.vendor, "CORNER SHOP");
        assert_eq!(outcome.record.date, "2024-05-01");
        assert_eq!(outcome.record.total_amount, Decimal::from_str("5.50").unwrap());
        assert_eq!(outcome.record.tax_amount, Decimal::from_str("0.50").unwrap());
        assert_eq!(outcome.record.currency, "EUR");
        assert_eq!(outcome.record.raw_text, RECEIPT);
        assert!(outcome.recognition_error.is_none());
    }

    #[test]
    fn test_blank_image_skips_recognizer() {
        let pipeline = ReceiptPipeline::new(FixedText::new(RECEIPT));
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([255])));
        let outcome = pipeline.process_image(&blank, Path::new("blank.png"));

        assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.extraction.fields.recovered_count(), 0);
    }

    #[test]
    fn test_recognizer_failure_is_absorbed() {
        let pipeline = ReceiptPipeline::new(Failing);
        let outcome = pipeline.process_image(&inked_image(), Path::new("r.png"));

        assert_eq!(outcome.record.currency, "USD");
        assert!(!outcome.record.is_recovered(ReceiptField::Currency));
        assert!(outcome.recognition_error.unwrap().contains("engine crashed"));
    }

    #[test]
    fn test_process_text() {
        let pipeline = ReceiptPipeline::new(Failing);
        let outcome = pipeline.process_text(RawText::new(RECEIPT), Path::new("-"));

        assert!(outcome.record.is_recovered(ReceiptField::TotalAmount));
        assert_eq!(outcome.skew_degrees, 0.0);
    }

    #[test]
    fn test_concurrent_scans_get_unique_ids() {
        let pipeline = ReceiptPipeline::new(FixedText::new(RECEIPT));
        let image = inked_image();

        let ids: HashSet<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let pipeline = &pipeline;
                    let image = &image;
                    scope.spawn(move || {
                        let name = format!("r{}.png", i);
                        pipeline.process_image(image, Path::new(&name)).record.id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(ids.len(), 4);
    }
}

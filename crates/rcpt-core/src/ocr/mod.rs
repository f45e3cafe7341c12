//! Image normalization and text recognition adapters.
//!
//! The recognition engine itself is an external capability. This module only
//! defines the [`TextRecognizer`] seam, the [`RawText`] it produces, and thin
//! adapters for the engines the CLI can drive.

mod normalizer;
#[cfg(feature = "native")]
mod pure_engine;
mod tesseract;

pub use normalizer::{
    binarize, correction_angle, estimate_skew, rotate_about_center, ImageNormalizer,
    NormalizedImage, INK, PAPER,
};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrRecognizer;
pub use tesseract::TesseractRecognizer;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::OcrError;
use crate::models::config::{RecognizerConfig, RecognizerEngine};

/// Text returned by a recognizer: an ordered sequence of lines.
///
/// May be empty, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawText(String);

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Build text from individual lines, joined with newlines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.0.lines()
    }

    /// Lines containing anything other than whitespace, in order.
    pub fn non_empty_lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines().filter(|l| !l.trim().is_empty())
    }

    /// True when the recognizer produced no visible characters.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RawText {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawText {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// The external "image → text" capability.
pub trait TextRecognizer {
    /// Short engine name for logs and output metadata.
    fn name(&self) -> &str;

    /// Recognize text in a cleaned image.
    fn recognize(&self, image: &GrayImage) -> Result<RawText, OcrError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage) -> Result<RawText, OcrError> {
        (**self).recognize(image)
    }
}

/// Create the recognizer selected in the configuration.
pub fn create_recognizer(config: &RecognizerConfig) -> Result<Box<dyn TextRecognizer>, OcrError> {
    let recognizer: Box<dyn TextRecognizer> = match config.engine {
        RecognizerEngine::Tesseract => Box::new(TesseractRecognizer::from_config(config)),
        #[cfg(feature = "native")]
        RecognizerEngine::PureOnnx => Box::new(PureOcrRecognizer::from_config(config)?),
        #[cfg(not(feature = "native"))]
        RecognizerEngine::PureOnnx => {
            return Err(OcrError::EngineUnavailable(
                "pure_onnx engine requires the `native` feature".to_string(),
            ));
        }
    };

    info!("Using {} text recognizer", recognizer.name());
    Ok(recognizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_lines() {
        let text = RawText::new("ACME MART\n\n   \n123 Main St\r\nTotal 4.00");

        let lines: Vec<&str> = text.non_empty_lines().collect();
        assert_eq!(lines, vec!["ACME MART", "123 Main St", "Total 4.00"]);
        assert!(!text.is_blank());
    }

    #[test]
    fn test_raw_text_from_lines() {
        let text = RawText::from_lines(["Joe's Diner", "Total: 9.50"]);
        assert_eq!(text.as_str(), "Joe's Diner\nTotal: 9.50");
    }

    #[test]
    fn test_blank_text() {
        assert!(RawText::default().is_blank());
        assert!(RawText::new(" \n\t\n").is_blank());
        assert_eq!(RawText::new(" \n\t\n").non_empty_lines().count(), 0);
    }

    #[test]
    fn test_create_missing_onnx_models_fails() {
        let config = RecognizerConfig {
            engine: RecognizerEngine::PureOnnx,
            model_dir: std::path::PathBuf::from("/nonexistent/rcpt-models"),
            ..Default::default()
        };

        assert!(create_recognizer(&config).is_err());
    }
}

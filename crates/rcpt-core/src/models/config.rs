//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RcptError, Result};

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Image normalization configuration.
    pub normalizer: NormalizerConfig,

    /// Text recognition engine configuration.
    pub recognizer: RecognizerConfig,

    /// Values used for record fields extraction could not recover.
    pub defaults: DefaultsConfig,
}

/// Image normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Gaussian blur sigma applied before thresholding (0 disables blur).
    pub blur_sigma: f32,

    /// Estimate and correct page skew.
    pub deskew: bool,

    /// Skew estimates larger than this (in degrees) are not applied.
    pub max_skew_degrees: f32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            deskew: true,
            max_skew_degrees: 45.0,
        }
    }
}

/// Which text recognition engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerEngine {
    /// The `tesseract` command-line program.
    Tesseract,
    /// PaddleOCR models run through `pure-onnx-ocr`.
    PureOnnx,
}

/// Text recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Engine to run.
    pub engine: RecognizerEngine,

    /// Tesseract executable name or path.
    pub tesseract_command: String,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    pub language: String,

    /// Tesseract page segmentation mode (`--psm`).
    pub page_segmentation_mode: Option<u8>,

    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens emitted by the ONNX recognizer.
    pub keep_unk: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            engine: RecognizerEngine::Tesseract,
            tesseract_command: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: None,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl RecognizerConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Record defaults applied after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub vendor: String,
    pub currency: String,
    pub payment_method: String,
    pub category: String,
    pub notes: String,

    /// Use today's date (UTC) when no date was found on the receipt.
    pub date_fallback_today: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            vendor: "Unknown".to_string(),
            currency: "USD".to_string(),
            payment_method: "Unknown".to_string(),
            category: "Uncategorized".to_string(),
            notes: String::new(),
            date_fallback_today: true,
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RcptError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RcptConfig =
            serde_json::from_str(r#"{"recognizer": {"engine": "pure_onnx"}}"#).unwrap();

        assert_eq!(config.recognizer.engine, RecognizerEngine::PureOnnx);
        assert_eq!(config.recognizer.language, "eng");
        assert_eq!(config.defaults.currency, "USD");
        assert!(config.normalizer.deskew);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RcptConfig::default();
        config.defaults.category = "Groceries".to_string();
        config.save(&path).unwrap();

        let loaded = RcptConfig::from_file(&path).unwrap();
        assert_eq!(loaded.defaults.category, "Groceries");
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(RcptConfig::from_file(&path), Err(RcptError::Config(_))));
    }
}

//! Recognizer that shells out to the `tesseract` command-line program.

use std::process::Command;
use std::time::Instant;

use image::{GrayImage, ImageFormat};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::RecognizerConfig;

use super::{RawText, TextRecognizer};

/// Tesseract CLI adapter.
///
/// The cleaned image is written to a temporary PNG and passed to
/// `tesseract <file> stdout`.
pub struct TesseractRecognizer {
    command: String,
    language: String,
    page_segmentation_mode: Option<u8>,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::from_config(&RecognizerConfig::default())
    }

    pub fn from_config(config: &RecognizerConfig) -> Self {
        Self {
            command: config.tesseract_command.clone(),
            language: config.language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    /// Set the executable to run.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the recognition language(s).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set `--psm`.
    pub fn with_page_segmentation_mode(mut self, psm: u8) -> Self {
        self.page_segmentation_mode = Some(psm);
        self
    }

    fn build_command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(input).arg("stdout").arg("-l").arg(&self.language);
        if let Some(psm) = self.page_segmentation_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> Result<RawText, OcrError> {
        let start = Instant::now();

        let input = tempfile::Builder::new()
            .prefix("rcpt-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Recognition(format!("failed to create temp file: {}", e)))?;

        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let output = self
            .build_command(input.path())
            .output()
            .map_err(|e| OcrError::EngineUnavailable(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} bytes", text.len());
        info!("Recognized text in {}ms", start.elapsed().as_millis());

        Ok(RawText::new(text))
    }
}

//! Pure Rust recognizer backed by `pure-onnx-ocr`.

use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::RecognizerConfig;

use super::{RawText, TextRecognizer};

/// Vertical bucket size (pixels) for grouping detected regions into lines.
const ROW_HEIGHT: f64 = 20.0;

/// Recognizer backed by PaddleOCR ONNX models (no external ONNX Runtime).
pub struct PureOcrRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl PureOcrRecognizer {
    /// Load detection and recognition models named in the configuration.
    pub fn from_config(config: &RecognizerConfig) -> Result<Self, OcrError> {
        let det_path = config.model_path(&config.detection_model);
        let rec_path = config.model_path(&config.recognition_model);
        let dict_path = config.model_path(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine,
            keep_unk: config.keep_unk,
        })
    }
}

impl TextRecognizer for PureOcrRecognizer {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn recognize(&self, image: &GrayImage) -> Result<RawText, OcrError> {
        let start = Instant::now();
        let image = DynamicImage::ImageLuma8(image.clone());

        let results = self
            .engine
            .run_from_image(&image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let mut regions: Vec<(i64, f64, String)> = results
            .iter()
            .map(|r| {
                let (left, top) = top_left(&r.bounding_box);
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                ((top / ROW_HEIGHT) as i64, left, text)
            })
            .collect();

        // Reading order: rows top to bottom, then left to right.
        regions.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<String> = Vec::new();
        let mut current_row = None;
        for (row, _, text) in regions {
            match lines.last_mut() {
                Some(line) if current_row == Some(row) => {
                    line.push(' ');
                    line.push_str(text.trim());
                }
                _ => lines.push(text.trim().to_string()),
            }
            current_row = Some(row);
        }

        info!(
            "Recognized {} lines in {}ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(RawText::from_lines(lines))
    }
}

/// Minimum x and y over a region polygon's exterior.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}

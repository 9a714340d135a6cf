//! OCRS engine implementation
//!
//! Pure Rust text recognizer using the ocrs library. No system dependencies
//! required. Downloads neural network models automatically on first use.
//! It reads printed-style text rather than LaTeX, so it mostly serves as a
//! dependency-free fallback for plain expressions.

use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::recognizer::LatexRecognizer;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const NAME: &str = "ocrs";

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Create the recognizer, downloading models if needed
    pub fn new(_config: &RecognizerConfig) -> Result<Self, RecognitionError> {
        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            RecognitionError::Initialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            RecognitionError::Initialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            RecognitionError::Initialization(format!("Failed to create OCR engine: {}", e))
        })?;

        Ok(Self { engine })
    }
}

impl LatexRecognizer for OcrsRecognizer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - no system dependencies, plain text output"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        // ocrs wants RGB8 in HWC layout
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            RecognitionError::Inference(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            RecognitionError::Inference(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            RecognitionError::Inference(format!("Failed to detect words: {}", e))
        })?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| RecognitionError::Inference(format!("Failed to recognize text: {}", e)))?;

        let lines: Vec<String> = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        Ok(join_lines(&lines))
    }
}

/// Multi-line results become one expression separated by `\\`.
fn join_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" \\\\ ")
}

fn model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("whiteboard-latex")
}

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, RecognitionError> {
    let cache_dir = model_cache_dir();

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        RecognitionError::Initialization(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq.
///
/// Written to a sibling temp file first so an interrupted download never
/// leaves a truncated model in the cache.
fn download_file(url: &str, path: &Path) -> Result<(), RecognitionError> {
    let response = ureq::get(url).call().map_err(|e| {
        RecognitionError::Initialization(format!("Failed to download model: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        RecognitionError::Initialization(format!("Failed to read response body: {}", e))
    })?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        RecognitionError::Initialization(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        RecognitionError::Initialization(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        RecognitionError::Initialization(format!("Failed to move model into cache: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_lines_single() {
        assert_eq!(join_lines(&["x + 1 = 2".to_string()]), "x + 1 = 2");
    }

    #[test]
    fn test_join_lines_skips_blank_lines() {
        let lines = vec![
            "a = b".to_string(),
            "   ".to_string(),
            " b = c ".to_string(),
        ];
        assert_eq!(join_lines(&lines), "a = b \\\\ b = c");
    }

    #[test]
    fn test_join_lines_empty() {
        assert_eq!(join_lines(&[]), "");
    }

    #[test]
    fn test_models_cached_under_crate_directory() {
        assert!(model_cache_dir().ends_with("whiteboard-latex"));
    }
}

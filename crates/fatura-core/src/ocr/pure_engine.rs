//! Pure Rust OCR backend using `pure-onnx-ocr`.

use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::error::RecognitionError;
use crate::models::config::RecognitionConfig;

use super::{BackendVariant, RecognitionBackend, RecognizedText};

/// Language codes served by the Latin-script recognition model.
const LATIN_LANGUAGES: &[&str] = &["en", "tr", "de", "fr", "es", "it", "pl", "pt", "nl"];

/// Translate a configured language code to the two-letter code used by the
/// PaddleOCR model family.
pub fn translate_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "eng" | "en" => "en".to_string(),
        "tur" | "tr" => "tr".to_string(),
        "deu" | "ger" | "de" => "de".to_string(),
        "fra" | "fre" | "fr" => "fr".to_string(),
        "pol" | "pl" => "pl".to_string(),
        other => other.to_string(),
    }
}

/// OCR backend backed by `pure-onnx-ocr` (no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
}

impl PureOcrEngine {
    /// Create an engine from the model files named in the configuration.
    pub fn from_config(config: &RecognitionConfig) -> Result<Self, RecognitionError> {
        let languages: Vec<String> = config
            .languages
            .iter()
            .map(|l| translate_language(l))
            .collect();

        if let Some(lang) = languages
            .iter()
            .find(|l| !LATIN_LANGUAGES.contains(&l.as_str()))
        {
            return Err(RecognitionError::Unavailable(format!(
                "no recognition model for language '{}'",
                lang
            )));
        }

        let [det_path, rec_path, dict_path] = config.model_files();
        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(RecognitionError::Unavailable(format!(
                    "model file not found: {} (run `fatura models download`)",
                    path.display()
                )));
            }
        }

        let start = Instant::now();
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| RecognitionError::Unavailable(format!("pure-onnx-ocr: {}", e)))?;

        info!(
            "Loaded pure-onnx-ocr engine from {} in {}ms (languages: {})",
            config.model_dir.display(),
            start.elapsed().as_millis(),
            languages.join(",")
        );

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl RecognitionBackend for PureOcrEngine {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Onnx
    }

    fn is_thread_safe(&self) -> bool {
        false
    }

    fn extract_text(&self, image: &GrayImage) -> Result<RecognizedText, RecognitionError> {
        let start = Instant::now();
        let input = DynamicImage::ImageLuma8(image.clone());

        let engine = self
            .engine
            .lock()
            .map_err(|_| RecognitionError::Failed("recognition engine poisoned".to_string()))?;
        let results = engine
            .run_from_image(&input)
            .map_err(|e| RecognitionError::Failed(format!("pure-onnx-ocr: {}", e)))?;
        drop(engine);

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let text = RecognizedText::from_scored(
            results
                .iter()
                .map(|r| (r.text.replace("[UNK]", " "), r.confidence as f32)),
        );

        debug!(
            "pure-onnx-ocr: kept {} phrases, confidence {:.2} in {}ms",
            text.lines.len(),
            text.confidence,
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

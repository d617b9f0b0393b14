//! Image preprocessing and pluggable text recognition backends.

mod preprocessing;
#[cfg(feature = "onnx")]
mod pure_engine;
mod tesseract;

pub use preprocessing::{otsu_threshold, ImagePreprocessor};
#[cfg(feature = "onnx")]
pub use pure_engine::{translate_language, PureOcrEngine};
pub use tesseract::TesseractBackend;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FaturaError, RecognitionError};
use crate::models::config::RecognitionConfig;

/// Tokens or phrases at or below this confidence are dropped.
pub const MIN_TOKEN_CONFIDENCE: f32 = 0.30;

/// Confidence assumed when a backend returns text without per-token scores.
pub const FALLBACK_CONFIDENCE: f32 = 0.70;

/// Available recognition backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendVariant {
    /// Tesseract via its command line, token-level confidence.
    Tesseract,
    /// PaddleOCR models via `pure-onnx-ocr`, phrase-level confidence.
    Onnx,
}

impl BackendVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendVariant::Tesseract => "tesseract",
            BackendVariant::Onnx => "onnx",
        }
    }

}

impl std::str::FromStr for BackendVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(BackendVariant::Tesseract),
            "onnx" | "paddle" | "paddleocr" => Ok(BackendVariant::Onnx),
            _ => Err(format!("unknown backend '{}'", s)),
        }
    }
}

impl std::fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities resolved once when the engine's backend is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Backend variant in use.
    pub backend: BackendVariant,
    /// Whether denoising and binarization run before recognition.
    pub advanced_preprocessing: bool,
    /// Whether recognition calls may run in parallel.
    pub concurrent: bool,
}

/// Output of a recognition backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedText {
    /// Full recognized text.
    pub text: String,
    /// Average confidence of the kept tokens (0.0 - 1.0).
    pub confidence: f32,
    /// Kept tokens or phrases, in the backend's reading order.
    pub lines: Vec<String>,
}

impl RecognizedText {
    /// Build from scored tokens, keeping those above [`MIN_TOKEN_CONFIDENCE`].
    ///
    /// Kept tokens are joined with single spaces into `text`.
    pub fn from_scored<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut lines = Vec::new();
        let mut sum = 0.0f32;

        for (token, confidence) in tokens {
            let token: String = token.into();
            if confidence > MIN_TOKEN_CONFIDENCE && !token.trim().is_empty() {
                sum += confidence.clamp(0.0, 1.0);
                lines.push(token);
            }
        }

        let confidence = if lines.is_empty() {
            0.0
        } else {
            sum / lines.len() as f32
        };

        Self {
            text: lines.join(" "),
            confidence,
            lines,
        }
    }

    /// Build from unscored text, assuming [`FALLBACK_CONFIDENCE`].
    pub fn unscored(text: String) -> Self {
        let lines = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect();

        Self {
            text,
            confidence: FALLBACK_CONFIDENCE,
            lines,
        }
    }
}

/// Trait for text recognition backends.
pub trait RecognitionBackend: Send + Sync {
    /// Backend variant.
    fn variant(&self) -> BackendVariant;

    /// Identifier reported in extraction results.
    fn id(&self) -> &str {
        self.variant().as_str()
    }

    /// Whether `extract_text` may be called from several threads at once.
    fn is_thread_safe(&self) -> bool;

    /// Recognize text in a preprocessed image.
    fn extract_text(&self, image: &GrayImage) -> Result<RecognizedText, RecognitionError>;
}

/// Construct a single backend variant.
pub fn create_backend(
    variant: BackendVariant,
    config: &RecognitionConfig,
) -> Result<Box<dyn RecognitionBackend>, RecognitionError> {
    match variant {
        BackendVariant::Tesseract => Ok(Box::new(TesseractBackend::new(config)?)),
        #[cfg(feature = "onnx")]
        BackendVariant::Onnx => Ok(Box::new(PureOcrEngine::from_config(config)?)),
        #[cfg(not(feature = "onnx"))]
        BackendVariant::Onnx => Err(RecognitionError::Unavailable(
            "built without the `onnx` feature".to_string(),
        )),
    }
}

/// Construct the first usable backend from the configured preference list.
///
/// Fails with [`FaturaError::Configuration`] when no variant can be built.
pub fn select_backend(
    config: &RecognitionConfig,
) -> Result<Box<dyn RecognitionBackend>, FaturaError> {
    let mut failures = Vec::new();

    for &variant in &config.backends {
        match create_backend(variant, config) {
            Ok(backend) => {
                info!("Using {} recognition backend", variant);
                return Ok(backend);
            }
            Err(e) => {
                warn!("{} backend unavailable: {}", variant, e);
                failures.push(format!("{}: {}", variant, e));
            }
        }
    }

    if failures.is_empty() {
        return Err(FaturaError::Configuration(
            "no recognition backends configured".to_string(),
        ));
    }

    Err(FaturaError::Configuration(format!(
        "no usable recognition backend ({})",
        failures.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_scored_filters_low_confidence() {
        let text = RecognizedText::from_scored([
            ("FATURA", 0.9),
            ("~", 0.1),
            ("No:", 0.7),
            ("   ", 0.95),
            ("ABC2024000000001", 0.8),
            ("edge", 0.30),
        ]);

        assert_eq!(text.lines, vec!["FATURA", "No:", "ABC2024000000001"]);
        assert_eq!(text.text, "FATURA No: ABC2024000000001");
        assert!((text.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_from_scored_empty() {
        let text = RecognizedText::from_scored(Vec::<(String, f32)>::new());
        assert_eq!(text, RecognizedText::default());
    }

    #[test]
    fn test_unscored_assumes_default_confidence() {
        let text = RecognizedText::unscored("FATURA\n\nToplam 100,00 TL\n".to_string());
        assert_eq!(text.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(text.lines, vec!["FATURA", "Toplam 100,00 TL"]);
    }

    #[test]
    fn test_backend_variant_names() {
        assert_eq!("Tesseract".parse::<BackendVariant>(), Ok(BackendVariant::Tesseract));
        assert_eq!("paddle".parse::<BackendVariant>(), Ok(BackendVariant::Onnx));
        assert_eq!(
            "easyocr".parse::<BackendVariant>(),
            Err("unknown backend 'easyocr'".to_string())
        );
        assert_eq!(
            serde_json::to_string(&BackendVariant::Onnx).unwrap(),
            "\"onnx\""
        );
    }

    #[test]
    fn test_no_backend_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecognitionConfig {
            tesseract_binary: dir.path().join("no-such-tesseract"),
            model_dir: dir.path().join("models"),
            ..Default::default()
        };

        let err = select_backend(&config).err().unwrap();
        assert!(matches!(err, FaturaError::Configuration(_)));
    }

    #[test]
    fn test_empty_preference_list() {
        let config = RecognitionConfig {
            backends: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            select_backend(&config),
            Err(FaturaError::Configuration(_))
        ));
    }
}

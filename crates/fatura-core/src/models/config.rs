//! Configuration structures for the extraction engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ocr::BackendVariant;

/// Main configuration for the fatura engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaturaConfig {
    /// Recognition backend configuration.
    pub recognition: RecognitionConfig,

    /// Image preprocessing configuration.
    pub preprocessing: PreprocessConfig,
}

/// Recognition backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Backend variants to try, in order of preference.
    pub backends: Vec<BackendVariant>,

    /// Ordered language set (three-letter Tesseract codes).
    pub languages: Vec<String>,

    /// Tesseract executable name or path.
    pub tesseract_binary: PathBuf,

    /// Directory holding the ONNX models and dictionary.
    pub model_dir: PathBuf,

    /// Detection model file name.
    pub detection_model: String,

    /// Recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendVariant::Tesseract, BackendVariant::Onnx],
            languages: vec!["eng".to_string(), "tur".to_string()],
            tesseract_binary: PathBuf::from("tesseract"),
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl RecognitionConfig {
    /// Full paths of the detection model, recognition model and dictionary.
    pub fn model_files(&self) -> [PathBuf; 3] {
        [
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(&self.recognition_model),
            self.model_dir.join(&self.dictionary),
        ]
    }
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Denoise and binarize; when false only grayscale conversion is applied.
    pub advanced: bool,

    /// Maximum image dimension (longer side) for recognition.
    pub max_image_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            advanced: true,
            max_image_size: 2048,
        }
    }
}

impl FaturaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

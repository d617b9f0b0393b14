//! Invoice extraction engine.
//!
//! Owns the recognition backend, the image preprocessor and the field parser.
//! The backend is built once, on first use, and shared by every call.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use image::GrayImage;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{FaturaError, Result};
use crate::invoice::{InvoiceParser, RuleBasedParser};
use crate::models::config::FaturaConfig;
use crate::models::invoice::ExtractionResult;
use crate::ocr::{select_backend, Capabilities, ImagePreprocessor, RecognitionBackend, RecognizedText};

/// The constructed backend together with its resolved capabilities.
struct BackendSlot {
    backend: Box<dyn RecognitionBackend>,
    capabilities: Capabilities,
    /// Serializes recognition when the backend is not thread-safe.
    gate: Option<Mutex<()>>,
}

impl BackendSlot {
    fn new(backend: Box<dyn RecognitionBackend>, advanced_preprocessing: bool) -> Self {
        let concurrent = backend.is_thread_safe();
        let capabilities = Capabilities {
            backend: backend.variant(),
            advanced_preprocessing,
            concurrent,
        };

        info!(
            "Recognition backend '{}' ready (concurrent: {}, advanced preprocessing: {})",
            backend.id(),
            concurrent,
            advanced_preprocessing
        );

        Self {
            backend,
            capabilities,
            gate: (!concurrent).then(|| Mutex::new(())),
        }
    }

    fn recognize(&self, image: &GrayImage) -> Result<RecognizedText> {
        let _guard: Option<MutexGuard<'_, ()>> = self
            .gate
            .as_ref()
            .map(|gate| gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));

        Ok(self.backend.extract_text(image)?)
    }
}

/// Invoice extraction engine.
///
/// Construct one per process and share it by reference; `process_invoice`
/// takes `&self` and may be called from several threads.
pub struct InvoiceEngine {
    config: FaturaConfig,
    preprocessor: ImagePreprocessor,
    parser: Box<dyn InvoiceParser>,
    backend: OnceCell<BackendSlot>,
}

impl InvoiceEngine {
    /// Create an engine. The recognition backend is built on first use.
    pub fn new(config: FaturaConfig) -> Self {
        Self {
            preprocessor: ImagePreprocessor::from_config(&config.preprocessing),
            parser: Box::new(RuleBasedParser::new()),
            backend: OnceCell::new(),
            config,
        }
    }

    /// Create an engine around an already constructed backend.
    pub fn with_backend(config: FaturaConfig, backend: Box<dyn RecognitionBackend>) -> Self {
        let engine = Self::new(config);
        let slot = BackendSlot::new(backend, engine.preprocessor.is_advanced());
        Self {
            backend: OnceCell::with_value(slot),
            ..engine
        }
    }

    /// Replace the field parser.
    pub fn with_parser(mut self, parser: Box<dyn InvoiceParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Build the recognition backend now instead of on the first call.
    ///
    /// Fails with [`FaturaError::Configuration`] when no configured backend is
    /// usable; the engine stays uninitialized and a later call retries.
    pub fn initialize(&self) -> Result<Capabilities> {
        Ok(self.slot()?.capabilities)
    }

    /// Capabilities of the backend, if it has been built.
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.backend.get().map(|slot| slot.capabilities)
    }

    fn slot(&self) -> Result<&BackendSlot> {
        self.backend.get_or_try_init(|| {
            let start = Instant::now();
            let backend = select_backend(&self.config.recognition)?;
            debug!("Backend constructed in {}ms", start.elapsed().as_millis());
            Ok::<_, FaturaError>(BackendSlot::new(backend, self.preprocessor.is_advanced()))
        })
    }

    /// Extract invoice fields from an image file.
    ///
    /// Fails only when no backend is usable, the image cannot be read, or the
    /// backend itself fails. Missing fields are empty in the result.
    pub fn process_invoice(&self, image_path: &Path) -> Result<ExtractionResult> {
        let start = Instant::now();
        let slot = self.slot()?;

        info!("Processing {}", image_path.display());
        let image = self.preprocessor.load(image_path)?;
        let recognized = slot.recognize(&image)?;

        debug!(
            "Recognized {} lines, confidence {:.2}",
            recognized.lines.len(),
            recognized.confidence
        );

        let result = self.extract_fields(&recognized.text, recognized.confidence, slot.backend.id());

        info!(
            "Processed {} in {}ms ({} words)",
            image_path.display(),
            start.elapsed().as_millis(),
            result.word_count
        );

        Ok(result)
    }

    /// Extract invoice fields from already recognized text.
    pub fn extract_fields(&self, text: &str, confidence: f32, backend_id: &str) -> ExtractionResult {
        let mut result = self.parser.parse(text);
        result.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        result.backend_id = backend_id.to_string();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::ocr::BackendVariant;
    use pretty_assertions::assert_eq;

    struct FixedBackend;

    impl RecognitionBackend for FixedBackend {
        fn variant(&self) -> BackendVariant {
            BackendVariant::Onnx
        }

        fn is_thread_safe(&self) -> bool {
            false
        }

        fn extract_text(&self, _image: &GrayImage) -> std::result::Result<RecognizedText, RecognitionError> {
            Ok(RecognizedText::unscored("Genel Toplam: 10,00 TL".to_string()))
        }
    }

    fn unusable_config() -> (tempfile::TempDir, FaturaConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FaturaConfig::default();
        config.recognition.tesseract_binary = dir.path().join("missing-tesseract");
        config.recognition.model_dir = dir.path().join("models");
        (dir, config)
    }

    #[test]
    fn test_new_is_lazy() {
        let (_dir, config) = unusable_config();
        let engine = InvoiceEngine::new(config);
        assert_eq!(engine.capabilities(), None);
    }

    #[test]
    fn test_initialize_failure_leaves_engine_unusable() {
        let (_dir, config) = unusable_config();
        let engine = InvoiceEngine::new(config);

        assert!(matches!(engine.initialize(), Err(FaturaError::Configuration(_))));
        assert_eq!(engine.capabilities(), None);
        assert!(matches!(
            engine.process_invoice(Path::new("invoice.png")),
            Err(FaturaError::Configuration(_))
        ));
    }

    #[test]
    fn test_injected_backend_capabilities() {
        let engine = InvoiceEngine::with_backend(FaturaConfig::default(), Box::new(FixedBackend));

        assert_eq!(
            engine.initialize().unwrap(),
            Capabilities {
                backend: BackendVariant::Onnx,
                advanced_preprocessing: true,
                concurrent: false,
            }
        );
    }

    #[test]
    fn test_extract_fields_sets_metadata() {
        let engine = InvoiceEngine::with_backend(FaturaConfig::default(), Box::new(FixedBackend));

        let result = engine.extract_fields("Genel Toplam: 10,00 TL", 1.7, "onnx");
        assert_eq!(result.amounts.total, 10.0);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.backend_id, "onnx");
        assert_eq!(result.word_count, 4);

        assert_eq!(engine.extract_fields("", f32::NAN, "onnx").confidence, 0.0);
    }
}

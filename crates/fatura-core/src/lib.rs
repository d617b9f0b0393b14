//! Core library for Turkish invoice OCR processing.
//!
//! This crate provides:
//! - Image preprocessing (grayscale, median denoise, Otsu binarization)
//! - Pluggable text recognition backends (Tesseract CLI, PaddleOCR via ONNX)
//! - Turkish invoice field extraction (invoice number, dates, amounts, parties)
//! - An engine tying the three together behind one call

pub mod engine;
pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;

pub use engine::InvoiceEngine;
pub use error::{FaturaError, RecognitionError, Result};
pub use invoice::{InvoiceParser, RuleBasedParser};
pub use models::config::{FaturaConfig, PreprocessConfig, RecognitionConfig};
pub use models::invoice::{Amounts, Customer, ExtractionResult, LineItem, Supplier};
pub use ocr::{BackendVariant, Capabilities, RecognitionBackend, RecognizedText};

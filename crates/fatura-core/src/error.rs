//! Error types for the fatura-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the fatura library.
///
/// Only two conditions are surfaced to callers as failures: no usable
/// recognition backend, and an input image that cannot be read. Fields that
/// cannot be extracted are represented as empty values in the result instead.
#[derive(Error, Debug)]
pub enum FaturaError {
    /// No recognition backend could be constructed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The given path is unreadable or not a decodable image.
    #[error("failed to read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The active backend failed at call time, after its own fallback.
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by recognition backends.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The backend cannot be used in this environment.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend ran but did not produce text.
    #[error("recognition failed: {0}")]
    Failed(String),

    /// I/O error while exchanging data with the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the fatura library.
pub type Result<T> = std::result::Result<T, FaturaError>;

//! Error taxonomy shared by all engine adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by engines, the registry and the shared plumbing.
///
/// Every failure is reported to the direct caller; nothing is retried at
/// this layer. The single intentional exception is a late or unmatched
/// desktop-service callback, which is dropped inside the bridge because it
/// can no longer be attributed to any live request.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Requested code resolvable neither through the backend vocabulary,
    /// nor the override table, nor the general ISO-639 registry.
    #[error("language code '{code}' is not supported by {engine}")]
    UnsupportedLanguage { code: String, engine: &'static str },

    /// No engine registered under the requested name.
    #[error("no OCR engine registered under the name '{0}'")]
    UnknownEngine(String),

    /// The desktop OCR service delivered no callback within the wait window.
    #[error("timed out after {timeout_secs}s waiting for an OCR result for {path:?}")]
    Timeout { path: PathBuf, timeout_secs: u64 },

    /// The backend process or model invocation failed outright.
    #[error("{engine} invocation failed: {message}")]
    Backend { engine: &'static str, message: String },

    /// The backend ran but produced output this adapter cannot interpret.
    #[error("unexpected {engine} output: {message}")]
    InvalidResponse { engine: &'static str, message: String },

    /// Input outside the accepted image representations, or a pixel
    /// buffer whose dimensions do not match its data.
    #[error("invalid image input: {0}")]
    InvalidImage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

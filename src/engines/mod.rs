//! Engine adapters.
//!
//! Each submodule wraps one external OCR backend behind [`OcrEngine`].
//! The backends themselves are external collaborators: Python libraries
//! run as one-shot interpreter subprocesses, Tesseract as its CLI, and
//! the WeChat desktop service as a long-lived child process.

pub mod easyocr;
pub mod paddle;
pub mod rapid;
pub mod surya;
pub mod tesseract;
pub mod wechat;

use std::ffi::OsStr;
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::error::OcrError;
use crate::input::ImageInput;
use crate::registry::EngineRegistration;
use crate::result::OcrResult;

/// The single capability every backend provides: image in, recognized
/// text items out. Engine-specific extras (per-call language overrides)
/// live on the concrete types.
pub trait OcrEngine: Send + Sync {
    /// Registry name of this engine.
    fn name(&self) -> &'static str;

    /// Recognize text in `image`. Blocks the calling thread for the full
    /// backend invocation; no retries, no cancellation.
    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError>;
}

/// Registration records for every engine shipped with the crate.
pub fn builtin_registrations() -> Vec<EngineRegistration> {
    vec![
        easyocr::registration(),
        paddle::registration(),
        rapid::registration(),
        surya::registration(),
        tesseract::registration(),
        wechat::registration(),
    ]
}

/// Look up one built-in engine by name, for the registry's
/// deferred-registration step.
pub(crate) fn builtin(name: &str) -> Option<EngineRegistration> {
    builtin_registrations().into_iter().find(|r| r.name == name)
}

/// Run a Python snippet as a one-shot subprocess and return its stdout.
///
/// The snippet is expected to print exactly one JSON document. A missing
/// interpreter or nonzero exit surfaces as [`OcrError::Backend`] with the
/// child's stderr attached.
pub(crate) fn run_python(
    engine: &'static str,
    python: &str,
    snippet: &str,
    args: &[&OsStr],
) -> Result<String, OcrError> {
    debug!(engine, python, "invoking python backend");
    let output = Command::new(python)
        .arg("-c")
        .arg(snippet)
        .args(args)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::Backend {
                    engine,
                    message: format!("python interpreter '{python}' not found"),
                }
            } else {
                OcrError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(OcrError::Backend {
            engine,
            message: format!(
                "python exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Helper shared by the engine factories: wrap a concrete engine as the
/// trait object the registry stores.
pub(crate) fn arc_engine<E: OcrEngine + 'static>(engine: E) -> Arc<dyn OcrEngine> {
    Arc::new(engine)
}

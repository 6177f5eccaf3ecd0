//! anyocr - one interface over external OCR engines.
//!
//! Several third-party OCR backends (EasyOCR, PaddleOCR, RapidOCR,
//! Tesseract, Surya, the WeChat desktop OCR service) are wrapped behind a
//! single [`OcrEngine`] trait: give any of them an image, get back
//! recognized text items with positions and confidence. Engines are
//! picked by name through an [`EngineRegistry`].
//!
//! ```no_run
//! use anyocr::{config::AppConfig, EngineRegistry, ImageInput};
//!
//! # fn main() -> Result<(), anyocr::OcrError> {
//! let registry = EngineRegistry::with_builtin_engines(AppConfig::default());
//! let engine = registry.get_instance("easyocr")?;
//! let result = engine.ocr(&ImageInput::Path("photo.png".into()))?;
//! for item in result.filter_default().items() {
//!     println!("{}", item.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engines;
pub mod error;
pub mod input;
pub mod lang;
pub mod models;
pub mod registry;
pub mod result;

pub use engines::OcrEngine;
pub use error::OcrError;
pub use input::{ImageInput, PixelBuffer, PixelFormat};
pub use registry::{EngineRegistration, EngineRegistry};
pub use result::{OcrItem, OcrResult, Quad};

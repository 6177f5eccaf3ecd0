//! PaddleOCR adapter.
//!
//! PaddleOCR speaks its own language-token space (`ch`, `en`, `japan`,
//! ...) and takes exactly one token, so no ISO normalization applies
//! here; the configured token is passed through untouched.

use std::ffi::OsStr;

use serde::Deserialize;

use crate::config::PaddleOcrConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "paddleocr";

const SNIPPET: &str = r#"
import json, sys
from paddleocr import PaddleOCR
engine = PaddleOCR(use_angle_cls=False, lang=sys.argv[1], det_limit_side_len=int(sys.argv[2]))
result = engine.ocr(sys.argv[3], cls=False)
lines = result[0] if result and result[0] else []
items = [
    {
        "box": [[float(x), float(y)] for x, y in box],
        "text": content[0],
        "confidence": float(content[1]),
    }
    for box, content in lines
]
print(json.dumps(items, ensure_ascii=False))
"#;

#[derive(Debug, Deserialize)]
struct ResponseItem {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>,
    text: String,
    confidence: f64,
}

pub struct PaddleOcrEngine {
    python: String,
    lang: String,
    det_limit_side_len: u32,
}

impl PaddleOcrEngine {
    pub fn new(config: &PaddleOcrConfig) -> Self {
        Self {
            python: config.python.clone(),
            lang: config.lang.clone(),
            det_limit_side_len: config.det_limit_side_len,
        }
    }
}

impl super::OcrEngine for PaddleOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        let path = image.to_path()?;
        let side_len = self.det_limit_side_len.to_string();
        let stdout = super::run_python(
            ENGINE_NAME,
            &self.python,
            SNIPPET,
            &[
                OsStr::new(&self.lang),
                OsStr::new(&side_len),
                path.as_path().as_os_str(),
            ],
        )?;
        parse_response(&stdout)
    }
}

fn parse_response(stdout: &str) -> Result<OcrResult, OcrError> {
    let response: Vec<ResponseItem> = serde_json::from_str(stdout)?;
    let mut items = Vec::with_capacity(response.len());
    for entry in response {
        let bbox = Quad::try_from_points(&entry.bbox).ok_or_else(|| OcrError::InvalidResponse {
            engine: ENGINE_NAME,
            message: format!("expected a 4-point box, got {:?}", entry.bbox),
        })?;
        items.push(OcrItem {
            text: entry.text,
            bbox: Some(bbox),
            confidence: Some(entry.confidence),
        });
    }
    Ok(OcrResult::new(items))
}

pub(crate) fn registration() -> EngineRegistration {
    EngineRegistration {
        name: ENGINE_NAME.to_string(),
        project_url: Some("https://github.com/PaddlePaddle/PaddleOCR".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(PaddleOcrEngine::new(&config.paddleocr)))),
    }
}

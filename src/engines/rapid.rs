//! RapidOCR adapter.
//!
//! RapidOCR runs PaddleOCR models through ONNX Runtime. The configured
//! detection/recognition model names resolve through [`ModelManager`] on
//! first use, so constructing the engine never touches the network.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::config::RapidOcrConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::models::ModelManager;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "rapidocr";

const SNIPPET: &str = r#"
import json, sys
from rapidocr_onnxruntime import RapidOCR
engine = RapidOCR(det_model_path=sys.argv[1], rec_model_path=sys.argv[2])
result, elapse = engine(sys.argv[3])
items = [
    {
        "box": [[float(x), float(y)] for x, y in box],
        "text": text,
        "confidence": float(conf),
    }
    for box, text, conf in (result or [])
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

pub struct RapidOcrEngine {
    python: String,
    det_model: String,
    rec_model: String,
    // Resolved det/rec paths, filled on first use.
    resolved: Mutex<Option<(PathBuf, PathBuf)>>,
}

impl RapidOcrEngine {
    pub fn new(config: &RapidOcrConfig) -> Self {
        Self {
            python: config.python.clone(),
            det_model: config.det_model.clone(),
            rec_model: config.rec_model.clone(),
            resolved: Mutex::new(None),
        }
    }

    /// Resolve (and if needed download) the configured models.
    fn model_paths(&self) -> Result<(PathBuf, PathBuf), OcrError> {
        let mut resolved = self.resolved.lock();
        if let Some(paths) = resolved.as_ref() {
            return Ok(paths.clone());
        }
        let manager = ModelManager::new().map_err(|e| OcrError::Backend {
            engine: ENGINE_NAME,
            message: format!("model cache unavailable: {e}"),
        })?;
        let det = manager
            .ensure_model(&self.det_model)
            .map_err(|e| model_error(&self.det_model, e))?;
        let rec = manager
            .ensure_model(&self.rec_model)
            .map_err(|e| model_error(&self.rec_model, e))?;
        debug!(det = ?det, rec = ?rec, "rapidocr models resolved");
        *resolved = Some((det.clone(), rec.clone()));
        Ok((det, rec))
    }
}

fn model_error(model: &str, e: anyhow::Error) -> OcrError {
    OcrError::Backend {
        engine: ENGINE_NAME,
        message: format!("could not resolve model '{model}': {e}"),
    }
}

impl super::OcrEngine for RapidOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        let (det, rec) = self.model_paths()?;
        let path = image.to_path()?;
        let stdout = super::run_python(
            ENGINE_NAME,
            &self.python,
            SNIPPET,
            &[
                det.as_os_str(),
                rec.as_os_str(),
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
        project_url: Some("https://github.com/RapidAI/RapidOCR".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(RapidOcrEngine::new(&config.rapidocr)))),
    }
}

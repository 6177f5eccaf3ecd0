//! EasyOCR adapter.
//!
//! EasyOCR fixes its language list when the `Reader` is built, so the
//! configured defaults are normalized once at construction and every
//! call uses them. The library runs in a one-shot Python subprocess
//! that prints a single JSON array.

use std::collections::BTreeSet;
use std::ffi::OsStr;

use serde::Deserialize;

use crate::config::EasyOcrConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::lang;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "easyocr";

const SNIPPET: &str = r#"
import json, sys
import easyocr
reader = easyocr.Reader(lang_list=json.loads(sys.argv[1]), gpu=json.loads(sys.argv[2]))
items = [
    {
        "box": [[float(p[0]), float(p[1])] for p in box],
        "text": text,
        "confidence": float(conf),
    }
    for box, text, conf in reader.readtext(sys.argv[3])
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

pub struct EasyOcrEngine {
    python: String,
    gpu: bool,
    default_languages: BTreeSet<String>,
}

impl EasyOcrEngine {
    /// Build the adapter; the configured language list is normalized here
    /// so a bad code fails at construction, not on the first call.
    pub fn new(config: &EasyOcrConfig) -> Result<Self, OcrError> {
        Ok(Self {
            python: config.python.clone(),
            gpu: config.gpu,
            default_languages: lang::EASYOCR.normalize(&config.languages)?,
        })
    }
}

impl super::OcrEngine for EasyOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        let path = image.to_path()?;
        let langs_json = serde_json::to_string(&self.default_languages)?;
        let gpu_json = if self.gpu { "true" } else { "false" };
        let stdout = super::run_python(
            ENGINE_NAME,
            &self.python,
            SNIPPET,
            &[
                OsStr::new(&langs_json),
                OsStr::new(gpu_json),
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
        project_url: Some("https://github.com/JaidedAI/EasyOCR".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(EasyOcrEngine::new(&config.easyocr)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_rounds_float_boxes() {
        let stdout = r#"[
            {"box": [[10.4, 5.6], [20.5, 5.6], [20.5, 15.5], [10.4, 15.5]],
             "text": "你好", "confidence": 0.9321}
        ]"#;
        let result = parse_response(stdout).unwrap();

        assert_eq!(result.len(), 1);
        let item = &result.items()[0];
        assert_eq!(item.text, "你好");
        assert_eq!(item.confidence, Some(0.9321));
        assert_eq!(
            item.bbox.unwrap().points(),
            &[[10, 6], [21, 6], [21, 16], [10, 16]]
        );
    }

    #[test]
    fn test_parse_response_rejects_non_quad_box() {
        let stdout = r#"[{"box": [[0.0, 0.0], [1.0, 0.0]], "text": "x", "confidence": 0.5}]"#;
        assert!(matches!(
            parse_response(stdout),
            Err(OcrError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_parse_response_empty_array() {
        assert!(parse_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_construction_normalizes_configured_languages() {
        let config = EasyOcrConfig {
            languages: vec!["zh".to_string(), "deu".to_string()],
            ..EasyOcrConfig::default()
        };
        let engine = EasyOcrEngine::new(&config).unwrap();
        let expected: BTreeSet<String> =
            ["ch_sim", "de"].iter().map(|s| s.to_string()).collect();
        assert_eq!(engine.default_languages, expected);
    }

    #[test]
    fn test_construction_rejects_bad_configured_language() {
        let config = EasyOcrConfig {
            languages: vec!["qq".to_string()],
            ..EasyOcrConfig::default()
        };
        assert!(matches!(
            EasyOcrEngine::new(&config),
            Err(OcrError::UnsupportedLanguage { .. })
        ));
    }
}

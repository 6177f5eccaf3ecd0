//! Surya adapter.
//!
//! The Surya recognition model takes a language list per call, so this
//! adapter exposes [`SuryaEngine::ocr_with_languages`] on top of the
//! trait method; both normalize through the Surya vocabulary first.

use std::collections::BTreeSet;
use std::ffi::OsStr;

use serde::Deserialize;

use crate::config::SuryaConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::lang;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "surya";

const SNIPPET: &str = r#"
import json, sys
from PIL import Image
from surya.ocr import run_ocr
from surya.model.detection.model import load_model as load_det_model, load_processor as load_det_processor
from surya.model.recognition.model import load_model as load_rec_model
from surya.model.recognition.processor import load_processor as load_rec_processor
langs = json.loads(sys.argv[1])
image = Image.open(sys.argv[2])
det_processor, det_model = load_det_processor(), load_det_model()
rec_model, rec_processor = load_rec_model(), load_rec_processor()
predictions = run_ocr([image], [langs], det_model, det_processor, rec_model, rec_processor)
items = [
    {
        "box": [[float(x), float(y)] for x, y in line.polygon],
        "text": line.text,
        "confidence": None if line.confidence is None else float(line.confidence),
    }
    for line in predictions[0].text_lines
]
print(json.dumps(items, ensure_ascii=False))
"#;

#[derive(Debug, Deserialize)]
struct ResponseItem {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>,
    text: String,
    confidence: Option<f64>,
}

pub struct SuryaEngine {
    python: String,
    default_languages: BTreeSet<String>,
}

impl SuryaEngine {
    pub fn new(config: &SuryaConfig) -> Result<Self, OcrError> {
        Ok(Self {
            python: config.python.clone(),
            default_languages: lang::SURYA.normalize(&config.languages)?,
        })
    }

    /// OCR with a per-call language list instead of the configured default.
    pub fn ocr_with_languages<S: AsRef<str>>(
        &self,
        image: &ImageInput,
        languages: &[S],
    ) -> Result<OcrResult, OcrError> {
        let normalized = lang::SURYA.normalize(languages)?;
        self.run(image, &normalized)
    }

    fn run(&self, image: &ImageInput, languages: &BTreeSet<String>) -> Result<OcrResult, OcrError> {
        let path = image.to_path()?;
        let langs_json = serde_json::to_string(languages)?;
        let stdout = super::run_python(
            ENGINE_NAME,
            &self.python,
            SNIPPET,
            &[OsStr::new(&langs_json), path.as_path().as_os_str()],
        )?;
        parse_response(&stdout)
    }
}

impl super::OcrEngine for SuryaEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        self.run(image, &self.default_languages)
    }
}

fn parse_response(stdout: &str) -> Result<OcrResult, OcrError> {
    let response: Vec<ResponseItem> = serde_json::from_str(stdout)?;
    let mut items = Vec::with_capacity(response.len());
    for entry in response {
        let bbox = Quad::try_from_points(&entry.bbox).ok_or_else(|| OcrError::InvalidResponse {
            engine: ENGINE_NAME,
            message: format!("expected a 4-point polygon, got {:?}", entry.bbox),
        })?;
        items.push(OcrItem {
            text: entry.text,
            bbox: Some(bbox),
            confidence: entry.confidence,
        });
    }
    Ok(OcrResult::new(items))
}

pub(crate) fn registration() -> EngineRegistration {
    EngineRegistration {
        name: ENGINE_NAME.to_string(),
        project_url: Some("https://github.com/VikParuchuri/surya".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(SuryaEngine::new(&config.surya)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_allows_missing_confidence() {
        let stdout = r#"[
            {"box": [[4.0, 4.0], [90.0, 4.0], [90.0, 20.0], [4.0, 20.0]],
             "text": "E = mc^2", "confidence": null}
        ]"#;
        let result = parse_response(stdout).unwrap();
        assert_eq!(result.items()[0].confidence, None);
        // Unscored items survive construction but not confidence filtering.
        assert!(result.filter_by_confidence(0.0).is_empty());
    }

    #[test]
    fn test_parse_response_structured_item() {
        let stdout = r#"[
            {"box": [[3.7, 1.2], [50.0, 1.2], [50.0, 18.8], [3.7, 18.8]],
             "text": "göçmen", "confidence": 0.87}
        ]"#;
        let result = parse_response(stdout).unwrap();
        let item = &result.items()[0];
        assert_eq!(item.text, "göçmen");
        assert_eq!(
            item.bbox.unwrap().points(),
            &[[4, 1], [50, 1], [50, 19], [4, 19]]
        );
    }

    #[test]
    fn test_default_languages_are_normalized() {
        let config = SuryaConfig {
            languages: vec!["eng".to_string(), "zho".to_string(), "_math".to_string()],
            ..SuryaConfig::default()
        };
        let engine = SuryaEngine::new(&config).unwrap();
        let expected: BTreeSet<String> =
            ["_math", "en", "zh"].iter().map(|s| s.to_string()).collect();
        assert_eq!(engine.default_languages, expected);
    }
}

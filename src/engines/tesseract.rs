//! Tesseract CLI adapter.
//!
//! Drives the `tesseract` executable in TSV mode:
//! `tesseract <image> stdout -l lang1+lang2 tsv`. TSV rows with a
//! negative confidence are layout nodes, not recognized words, and are
//! skipped; word confidences arrive as percentages and are scaled to
//! `[0, 1]`.

use std::collections::BTreeSet;
use std::process::Command;

use tracing::{debug, warn};

use crate::config::TesseractConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::lang;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "tesseract";

pub struct TesseractEngine {
    command: String,
    default_languages: BTreeSet<String>,
}

impl TesseractEngine {
    /// Build the adapter. The configured default languages are normalized
    /// here so a bad configured code fails fast; the executable is probed
    /// with `--version` but a missing install only logs a warning, the
    /// engine then fails on first use.
    pub fn new(config: &TesseractConfig) -> Result<Self, OcrError> {
        let default_languages = lang::TESSERACT.normalize(&config.languages)?;
        let engine = Self {
            command: config.command.clone(),
            default_languages,
        };
        match Command::new(&engine.command).arg("--version").output() {
            Ok(output) => {
                let version = String::from_utf8_lossy(&output.stdout);
                debug!(
                    version = version.lines().next().unwrap_or("unknown"),
                    "tesseract available"
                );
            }
            Err(e) => warn!(
                command = %engine.command,
                "tesseract executable not found ({e}); OCR calls will fail"
            ),
        }
        Ok(engine)
    }

    /// OCR with a per-call language list instead of the configured default.
    pub fn ocr_with_languages<S: AsRef<str>>(
        &self,
        image: &ImageInput,
        languages: &[S],
    ) -> Result<OcrResult, OcrError> {
        let normalized = lang::TESSERACT.normalize(languages)?;
        self.run(image, &normalized)
    }

    fn run(&self, image: &ImageInput, languages: &BTreeSet<String>) -> Result<OcrResult, OcrError> {
        let path = image.to_path()?;
        let lang_arg = languages.iter().cloned().collect::<Vec<_>>().join("+");
        debug!(languages = %lang_arg, "running tesseract");

        let output = Command::new(&self.command)
            .arg(path.as_path())
            .arg("stdout")
            .args(["-l", lang_arg.as_str()])
            .arg("tsv")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::Backend {
                        engine: ENGINE_NAME,
                        message: format!("'{}' not found (install tesseract-ocr)", self.command),
                    }
                } else {
                    OcrError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(OcrError::Backend {
                engine: ENGINE_NAME,
                message: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let items = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        Ok(OcrResult::new(items))
    }
}

impl super::OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        self.run(image, &self.default_languages)
    }
}

/// Parse tesseract's TSV output into items.
///
/// Column layout: `level page_num block_num par_num line_num word_num
/// left top width height conf text`. The trailing text column may itself
/// contain tabs, so the first 11 columns are split off and the rest kept
/// verbatim.
fn parse_tsv(tsv: &str) -> Result<Vec<OcrItem>, OcrError> {
    let mut items = Vec::new();
    for line in tsv.lines().skip(1) {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.splitn(12, '\t').collect();
        if fields.len() != 12 {
            return Err(OcrError::InvalidResponse {
                engine: ENGINE_NAME,
                message: format!("malformed TSV row: {line:?}"),
            });
        }
        let conf: f64 = fields[10].parse().map_err(|_| OcrError::InvalidResponse {
            engine: ENGINE_NAME,
            message: format!("bad confidence {:?} in row {line:?}", fields[10]),
        })?;
        if conf < 0.0 {
            continue;
        }
        let (left, top, width, height) = parse_rect(&fields[6..10], line)?;
        items.push(OcrItem {
            text: fields[11].to_string(),
            bbox: Some(Quad::from_rect(left, top, left + width, top + height)),
            confidence: Some(conf / 100.0),
        });
    }
    Ok(items)
}

fn parse_rect(fields: &[&str], line: &str) -> Result<(i32, i32, i32, i32), OcrError> {
    let mut values = [0i32; 4];
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field.parse().map_err(|_| OcrError::InvalidResponse {
            engine: ENGINE_NAME,
            message: format!("bad geometry {field:?} in row {line:?}"),
        })?;
    }
    Ok((values[0], values[1], values[2], values[3]))
}

pub(crate) fn registration() -> EngineRegistration {
    EngineRegistration {
        name: ENGINE_NAME.to_string(),
        project_url: Some("https://github.com/tesseract-ocr/tesseract".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(TesseractEngine::new(&config.tesseract)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }

    #[test]
    fn test_parse_tsv_skips_negative_confidence_rows() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t",
            "5\t1\t1\t1\t1\t1\t12\t8\t40\t16\t96.5\thello",
            "5\t1\t1\t1\t1\t2\t60\t8\t52\t16\t88\tworld",
        ]);
        let items = parse_tsv(&input).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "hello");
        assert_eq!(items[1].text, "world");
    }

    #[test]
    fn test_parse_tsv_scales_confidence_and_expands_rect() {
        let input = tsv(&["5\t1\t1\t1\t1\t1\t12\t8\t40\t16\t96.5\thello"]);
        let items = parse_tsv(&input).unwrap();

        assert_eq!(items[0].confidence, Some(0.965));
        assert_eq!(
            items[0].bbox.unwrap().points(),
            &[[12, 8], [52, 8], [52, 24], [12, 24]]
        );
    }

    #[test]
    fn test_parse_tsv_keeps_row_order() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t90\tfirst",
            "5\t1\t1\t1\t2\t1\t0\t20\t10\t10\t90\tsecond",
        ]);
        let items = parse_tsv(&input).unwrap();
        assert_eq!(items[0].text, "first");
        assert_eq!(items[1].text, "second");
    }

    #[test]
    fn test_parse_tsv_rejects_malformed_rows() {
        let input = tsv(&["5\t1\t1\t1"]);
        assert!(matches!(
            parse_tsv(&input),
            Err(OcrError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_parse_tsv_empty_output() {
        assert!(parse_tsv(&tsv(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_construction_rejects_bad_configured_language() {
        let config = TesseractConfig {
            command: "tesseract".to_string(),
            languages: vec!["not-a-language".to_string()],
        };
        assert!(matches!(
            TesseractEngine::new(&config),
            Err(OcrError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_construction_survives_missing_executable() {
        let config = TesseractConfig {
            command: "/definitely/not/tesseract".to_string(),
            languages: vec!["eng".to_string()],
        };
        assert!(TesseractEngine::new(&config).is_ok());
    }
}

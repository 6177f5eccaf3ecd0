//! Application configuration.
//!
//! Engine settings stored in TOML format, one section per engine. Every
//! section is optional in the file; missing sections fall back to the
//! engine's defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Python interpreter used for the Python-library engines.
pub const DEFAULT_PYTHON: &str = "python";

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine used when the caller does not name one.
    pub default_engine: String,
    pub easyocr: EasyOcrConfig,
    pub paddleocr: PaddleOcrConfig,
    pub rapidocr: RapidOcrConfig,
    pub surya: SuryaConfig,
    pub tesseract: TesseractConfig,
    pub wechat_ocr: WechatOcrConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_engine: "easyocr".to_string(),
            easyocr: EasyOcrConfig::default(),
            paddleocr: PaddleOcrConfig::default(),
            rapidocr: RapidOcrConfig::default(),
            surya: SuryaConfig::default(),
            tesseract: TesseractConfig::default(),
            wechat_ocr: WechatOcrConfig::default(),
        }
    }
}

/// EasyOCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EasyOcrConfig {
    /// Default language list, normalized at engine construction.
    pub languages: Vec<String>,
    /// Run recognition on the GPU.
    pub gpu: bool,
    /// Python interpreter command.
    pub python: String,
}

impl Default for EasyOcrConfig {
    fn default() -> Self {
        Self {
            languages: vec!["ch_sim".to_string(), "en".to_string()],
            gpu: false,
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

/// PaddleOCR settings. `lang` is PaddleOCR's own token space (`ch`,
/// `en`, `japan`, ...), not ISO-639, and is passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddleOcrConfig {
    pub lang: String,
    /// Long-side limit for the detection stage.
    pub det_limit_side_len: u32,
    pub python: String,
}

impl Default for PaddleOcrConfig {
    fn default() -> Self {
        Self {
            lang: "ch".to_string(),
            det_limit_side_len: 960,
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

/// RapidOCR settings. Model names resolve through the model manager;
/// an existing filesystem path is used as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RapidOcrConfig {
    pub det_model: String,
    pub rec_model: String,
    pub python: String,
}

impl Default for RapidOcrConfig {
    fn default() -> Self {
        Self {
            det_model: "ch_PP-OCRv4_det_infer.onnx".to_string(),
            rec_model: "ch_PP-OCRv4_rec_infer.onnx".to_string(),
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

/// Surya settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuryaConfig {
    /// Default language list, normalized at engine construction.
    pub languages: Vec<String>,
    pub python: String,
}

impl Default for SuryaConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "zh".to_string(), "_math".to_string()],
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

/// Tesseract settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Tesseract executable command or path.
    pub command: String,
    /// Default language list, normalized at engine construction.
    pub languages: Vec<String>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            languages: vec!["eng".to_string(), "chi_sim".to_string()],
        }
    }
}

/// WeChat OCR desktop-service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WechatOcrConfig {
    /// Directory holding the service's libraries.
    pub dir: Option<PathBuf>,
    /// Path to the service executable.
    pub exe_path: Option<PathBuf>,
    /// How long one request waits for its callback.
    pub timeout_secs: u64,
}

impl Default for WechatOcrConfig {
    fn default() -> Self {
        Self {
            dir: None,
            exe_path: None,
            timeout_secs: 10,
        }
    }
}

/// Load configuration from file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory.
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "anyocr", "anyocr")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Get the application data directory.
pub fn data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "anyocr", "anyocr")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

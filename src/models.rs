//! ONNX model management for RapidOCR.
//!
//! Handles downloading and caching of the detection/recognition models
//! from the `SWHL/RapidOCR` Hugging Face repository. Models are cached
//! under the application data directory, keyed by the PP-OCR version
//! folder embedded in the model name.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Plausible size bounds for an ONNX OCR model file, used as a cheap
/// integrity check after download.
const MODEL_SIZE_RANGE: (u64, u64) = (500_000, 500_000_000);

/// Version folder on the Hugging Face side, derived from the `PP-OCRv*`
/// fragment of the model name. Names without one live in the v1 folder.
pub fn model_version(model_name: &str) -> &'static str {
    for version in ["PP-OCRv4", "PP-OCRv3", "PP-OCRv2"] {
        if model_name.contains(version) {
            return version;
        }
    }
    "PP-OCRv1"
}

/// Download URL for a model name.
pub fn model_url(model_name: &str) -> String {
    format!(
        "https://huggingface.co/SWHL/RapidOCR/resolve/main/{}/{}?download=true",
        model_version(model_name),
        model_name
    )
}

/// Manifest tracking downloaded models.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub filename: String,
    pub url: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub downloaded_at: String,
}

/// Downloads and caches ONNX models.
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Manager rooted at the application data directory.
    pub fn new() -> Result<Self> {
        let models_dir = crate::config::data_dir()?.join("models");
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Manager rooted at a custom directory.
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cache location for a model name.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models_dir
            .join(model_version(model_name))
            .join(model_name)
    }

    /// Whether a model is cached with a plausible file size.
    pub fn is_model_available(&self, model_name: &str) -> bool {
        let path = self.model_path(model_name);
        match std::fs::metadata(&path) {
            Ok(metadata) => {
                let (min, max) = MODEL_SIZE_RANGE;
                metadata.len() >= min && metadata.len() <= max
            }
            Err(_) => false,
        }
    }

    /// Resolve a model to a local path, downloading on a cache miss.
    ///
    /// A name that is already an existing filesystem path is returned
    /// untouched without any network traffic, so callers can point at
    /// their own model files.
    pub fn ensure_model(&self, model_name: &str) -> Result<PathBuf> {
        if Path::new(model_name).exists() {
            debug!(model = model_name, "using explicit model path");
            return Ok(PathBuf::from(model_name));
        }

        let path = self.model_path(model_name);
        if self.is_model_available(model_name) {
            debug!(model = model_name, "model already cached at {:?}", path);
            return Ok(path);
        }

        self.download_model(model_name)?;
        Ok(path)
    }

    fn download_model(&self, model_name: &str) -> Result<()> {
        let url = model_url(model_name);
        let path = self.model_path(model_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Downloading model {} from {}", model_name, url);

        if std::env::var("ANYOCR_OFFLINE").is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download models. Please download manually from {} and place at {:?}",
                url,
                path
            );
        }

        let rt = Runtime::new().context("Failed to create tokio runtime")?;
        let sha256 = rt.block_on(self.download_file_async(&url, &path))?;

        if !self.is_model_available(model_name) {
            anyhow::bail!("Download completed but model verification failed");
        }

        self.update_manifest(model_name, &url, &sha256)?;
        info!("Successfully downloaded model {}", model_name);
        Ok(())
    }

    /// Stream the download into `<path>.tmp`, returning the SHA-256 of
    /// the received bytes; the temp file is renamed into place only after
    /// the stream completes.
    async fn download_file_async(&self, url: &str, path: &Path) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("Download size: {:?} bytes", total_size);

        let temp_path = path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk)
                .context("Failed to write to temp file")?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }
        debug!("Downloaded {} / {:?} bytes", downloaded, total_size);

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        std::fs::rename(&temp_path, path)
            .context("Failed to move downloaded file to final location")?;

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn update_manifest(&self, model_name: &str, url: &str, sha256: &str) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let metadata = std::fs::metadata(self.model_path(model_name))?;

        let info = ModelInfo {
            filename: model_name.to_string(),
            url: url.to_string(),
            size_bytes: metadata.len(),
            sha256: sha256.to_string(),
            downloaded_at: unix_timestamp(),
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == info.filename)
        {
            *existing = info;
        } else {
            manifest.models.push(info);
        }

        self.save_manifest(&manifest)
    }

    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(ModelManifest::default())
        }
    }

    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

fn unix_timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_version_derivation() {
        assert_eq!(model_version("ch_PP-OCRv4_det_infer.onnx"), "PP-OCRv4");
        assert_eq!(model_version("en_PP-OCRv3_rec_infer.onnx"), "PP-OCRv3");
        assert_eq!(model_version("ch_PP-OCRv2_det_infer.onnx"), "PP-OCRv2");
        // No version fragment falls back to the v1 folder.
        assert_eq!(model_version("japan_rec_crnn_v2.onnx"), "PP-OCRv1");
        assert_eq!(
            model_version("ch_ppocr_server_v2.0_rec_infer.onnx"),
            "PP-OCRv1"
        );
    }

    #[test]
    fn test_model_url_layout() {
        assert_eq!(
            model_url("ch_PP-OCRv4_det_infer.onnx"),
            "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx?download=true"
        );
    }

    #[test]
    fn test_model_path_uses_version_folder() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            manager.model_path("ch_PP-OCRv4_det_infer.onnx"),
            dir.path().join("PP-OCRv4").join("ch_PP-OCRv4_det_infer.onnx")
        );
    }

    #[test]
    fn test_explicit_existing_path_is_returned_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let model_file = dir.path().join("my_det.onnx");
        std::fs::write(&model_file, b"not a real model").unwrap();

        let manager = ModelManager::with_dir(dir.path().join("cache")).unwrap();
        let resolved = manager
            .ensure_model(model_file.to_str().unwrap())
            .unwrap();
        assert_eq!(resolved, model_file);
        // Nothing was copied into the cache.
        assert!(!manager.models_dir().join("PP-OCRv1").exists());
    }

    #[test]
    fn test_missing_model_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();
        assert!(!manager.is_model_available("ch_PP-OCRv4_det_infer.onnx"));
    }

    #[test]
    fn test_undersized_cached_file_fails_availability() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();
        let path = manager.model_path("ch_PP-OCRv4_det_infer.onnx");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"truncated").unwrap();
        assert!(!manager.is_model_available("ch_PP-OCRv4_det_infer.onnx"));
    }

    #[test]
    fn test_manifest_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();
        assert!(manager.load_manifest().unwrap().models.is_empty());
    }
}

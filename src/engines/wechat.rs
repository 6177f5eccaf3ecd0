//! WeChat OCR desktop-service bridge.
//!
//! The WeChat OCR service is an always-running external process that
//! delivers results asynchronously, echoing back only the image path it
//! was asked about. This adapter turns that into a synchronous call: a
//! pending slot is registered under the resolved absolute path, the
//! request is submitted, and the calling thread blocks on the slot until
//! the callback arrives or the timeout elapses. The slot entry is removed
//! on every exit path.
//!
//! The path is the only correlation key the service offers, so duplicate
//! concurrent requests for the same path have no defined order; callers
//! must not issue them.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::WechatOcrConfig;
use crate::error::OcrError;
use crate::input::ImageInput;
use crate::registry::EngineRegistration;
use crate::result::{OcrItem, OcrResult, Quad};

const ENGINE_NAME: &str = "wechat_ocr";

/// In-flight requests, keyed by resolved absolute image path. Each slot
/// is a one-shot channel; the lock is held only for the map operation,
/// never across the blocking wait.
pub(crate) struct PendingTable {
    slots: Mutex<HashMap<PathBuf, Sender<Vec<OcrItem>>>>,
}

impl PendingTable {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Register a slot for `path` and return its receiving end.
    fn register(&self, path: PathBuf) -> Receiver<Vec<OcrItem>> {
        let (tx, rx) = bounded(1);
        self.slots.lock().insert(path, tx);
        rx
    }

    /// Deliver a callback result. An unmatched path (late callback, or
    /// the caller already timed out and removed the entry) is dropped
    /// silently; it cannot be attributed to any live request.
    fn resolve(&self, path: &Path, items: Vec<OcrItem>) {
        let sender = self.slots.lock().remove(path);
        match sender {
            Some(tx) => {
                let _ = tx.send(items);
            }
            None => debug!(path = ?path, "dropping unmatched OCR callback"),
        }
    }

    /// Drop the entry for `path`, if any.
    fn remove(&self, path: &Path) {
        self.slots.lock().remove(path);
    }

    #[cfg(test)]
    fn contains(&self, path: &Path) -> bool {
        self.slots.lock().contains_key(path)
    }
}

#[derive(Debug, Deserialize)]
struct Callback {
    #[serde(rename = "imgPath")]
    img_path: PathBuf,
    #[serde(rename = "ocrResult")]
    ocr_result: Vec<CallbackItem>,
}

#[derive(Debug, Deserialize)]
struct CallbackItem {
    text: String,
    location: Location,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Location {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

fn parse_callback(line: &str) -> Result<(PathBuf, Vec<OcrItem>), serde_json::Error> {
    let callback: Callback = serde_json::from_str(line)?;
    let items = callback
        .ocr_result
        .into_iter()
        .map(|item| OcrItem {
            bbox: Some(Quad::from_rect(
                item.location.left,
                item.location.top,
                item.location.right,
                item.location.bottom,
            )),
            text: item.text,
            confidence: item.score,
        })
        .collect();
    Ok((callback.img_path, items))
}

/// Handle to the spawned service process: its stdin for requests and
/// one reader thread feeding the pending table from its stdout.
struct WechatService {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
}

impl WechatService {
    fn spawn(
        exe_path: &Path,
        dir: Option<&Path>,
        pending: Arc<PendingTable>,
    ) -> Result<Self, OcrError> {
        let mut command = Command::new(exe_path);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| OcrError::Backend {
            engine: ENGINE_NAME,
            message: "could not open service stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| OcrError::Backend {
            engine: ENGINE_NAME,
            message: "could not open service stdout".to_string(),
        })?;

        // Callback delivery thread, driven by the external process.
        std::thread::Builder::new()
            .name("wechat-ocr-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_callback(&line) {
                        Ok((path, items)) => pending.resolve(&path, items),
                        Err(e) => debug!("unparseable service payload: {e}"),
                    }
                }
                debug!("wechat ocr reader thread exiting");
            })?;

        info!("wechat ocr service started from {:?}", exe_path);
        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
        })
    }

    /// Issue the asynchronous request for `path`.
    fn submit(&self, path: &Path) -> Result<(), OcrError> {
        let request = serde_json::json!({ "imgPath": path });
        let mut stdin = self.stdin.lock();
        stdin.write_all(request.to_string().as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }
}

impl Drop for WechatService {
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            debug!("failed to kill wechat ocr service: {e}");
        }
        let _ = child.wait();
    }
}

pub struct WechatOcrEngine {
    timeout: Duration,
    pending: Arc<PendingTable>,
    service: Option<WechatService>,
}

impl WechatOcrEngine {
    /// Build the adapter and start the service if its executable is
    /// configured and present. A missing executable only logs a warning;
    /// the degraded engine fails on first use instead.
    pub fn new(config: &WechatOcrConfig) -> Self {
        let pending = Arc::new(PendingTable::new());
        let service = match &config.exe_path {
            Some(exe) if exe.exists() => {
                match WechatService::spawn(exe, config.dir.as_deref(), pending.clone()) {
                    Ok(service) => Some(service),
                    Err(e) => {
                        warn!("could not start wechat ocr service: {e}");
                        None
                    }
                }
            }
            Some(exe) => {
                warn!("wechat ocr executable {:?} not found; engine unusable until installed", exe);
                None
            }
            None => {
                warn!("wechat_ocr exe_path not configured; engine unusable");
                None
            }
        };
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            pending,
            service,
        }
    }
}

impl super::OcrEngine for WechatOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn ocr(&self, image: &ImageInput) -> Result<OcrResult, OcrError> {
        let service = self.service.as_ref().ok_or_else(|| OcrError::Backend {
            engine: ENGINE_NAME,
            message: "service not running (check dir/exe_path configuration)".to_string(),
        })?;

        let path = image.to_path()?;
        // The service echoes the path back verbatim, so the key must be
        // in canonical form on both sides.
        let key = std::fs::canonicalize(path.as_path())?;

        let slot = self.pending.register(key.clone());
        if let Err(e) = service.submit(&key) {
            self.pending.remove(&key);
            return Err(e);
        }

        let outcome = slot.recv_timeout(self.timeout);
        // Success or timeout, the entry never outlives the wait.
        self.pending.remove(&key);

        match outcome {
            Ok(items) => Ok(OcrResult::new(items)),
            Err(_) => Err(OcrError::Timeout {
                path: key,
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

pub(crate) fn registration() -> EngineRegistration {
    EngineRegistration {
        name: ENGINE_NAME.to_string(),
        project_url: Some("https://github.com/EEEEhex/QQImpl".to_string()),
        factory: Box::new(|config| Ok(super::arc_engine(WechatOcrEngine::new(&config.wechat_ocr)))),
    }
}

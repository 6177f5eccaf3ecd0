//! Engine registry.
//!
//! An explicitly constructed, explicitly passed registry: engine names
//! map to factories, instances are built lazily and cached so each name
//! is constructed at most once per registry lifetime. No process-global
//! state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::engines::{self, OcrEngine};
use crate::error::OcrError;

/// Constructs an engine instance from the per-engine configuration.
pub type EngineFactory =
    Box<dyn Fn(&AppConfig) -> Result<Arc<dyn OcrEngine>, OcrError> + Send + Sync>;

/// One engine known to the registry.
pub struct EngineRegistration {
    /// Name callers pass to [`EngineRegistry::get_instance`].
    pub name: String,
    /// Upstream project URL, for `--list-engines` style output.
    pub project_url: Option<String>,
    /// Lazy constructor.
    pub factory: EngineFactory,
}

/// Name-keyed table of engine factories plus the singleton instance cache.
pub struct EngineRegistry {
    config: AppConfig,
    table: RwLock<HashMap<String, EngineRegistration>>,
    instances: Mutex<HashMap<String, Arc<dyn OcrEngine>>>,
}

impl EngineRegistry {
    /// Empty registry; engines are still reachable through the
    /// deferred built-in lookup in [`get_instance`](Self::get_instance).
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            table: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with every built-in engine pre-registered.
    pub fn with_builtin_engines(config: AppConfig) -> Self {
        let registry = Self::new(config);
        for registration in engines::builtin_registrations() {
            registry.register(registration);
        }
        registry
    }

    /// Insert or overwrite a registration. An existing cached instance
    /// under the same name stays valid for callers already holding it
    /// but is dropped from the cache so the new factory takes effect.
    pub fn register(&self, registration: EngineRegistration) {
        debug!(name = %registration.name, "registering OCR engine");
        self.instances.lock().remove(&registration.name);
        self.table
            .write()
            .insert(registration.name.clone(), registration);
    }

    /// Every registered engine as `(name, project_url)`, without forcing
    /// instantiation. Sorted by name for stable output.
    pub fn engines(&self) -> Vec<(String, Option<String>)> {
        let table = self.table.read();
        let mut names: Vec<_> = table
            .values()
            .map(|r| (r.name.clone(), r.project_url.clone()))
            .collect();
        names.sort();
        names
    }

    /// Look up an engine by name, constructing it on first use.
    ///
    /// Repeat calls return the same cached instance. A name missing from
    /// the table is first checked against the built-in engine set
    /// (deferred registration) before failing with
    /// [`OcrError::UnknownEngine`].
    pub fn get_instance(&self, name: &str) -> Result<Arc<dyn OcrEngine>, OcrError> {
        let mut instances = self.instances.lock();
        if let Some(engine) = instances.get(name) {
            return Ok(engine.clone());
        }

        if !self.table.read().contains_key(name) {
            match engines::builtin(name) {
                Some(registration) => {
                    debug!(name, "deferred registration of built-in engine");
                    self.table.write().insert(name.to_string(), registration);
                }
                None => return Err(OcrError::UnknownEngine(name.to_string())),
            }
        }

        let table = self.table.read();
        let registration = table
            .get(name)
            .ok_or_else(|| OcrError::UnknownEngine(name.to_string()))?;
        info!(name, "constructing OCR engine");
        let engine = (registration.factory)(&self.config)?;
        instances.insert(name.to_string(), engine.clone());
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ImageInput;
    use crate::result::OcrResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEngine {
        label: &'static str,
    }

    impl OcrEngine for FakeEngine {
        fn name(&self) -> &'static str {
            self.label
        }

        fn ocr(&self, _image: &ImageInput) -> Result<OcrResult, OcrError> {
            Ok(OcrResult::new(Vec::new()))
        }
    }

    fn fake_registration(
        name: &str,
        label: &'static str,
        constructions: Arc<AtomicUsize>,
    ) -> EngineRegistration {
        EngineRegistration {
            name: name.to_string(),
            project_url: Some(format!("https://example.com/{name}")),
            factory: Box::new(move |_config| {
                constructions.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(FakeEngine { label }) as Arc<dyn OcrEngine>)
            }),
        }
    }

    #[test]
    fn test_get_instance_is_singleton_per_name() {
        let registry = EngineRegistry::new(AppConfig::default());
        let constructions = Arc::new(AtomicUsize::new(0));
        registry.register(fake_registration("fake", "fake", constructions.clone()));

        let first = registry.get_instance("fake").unwrap();
        let second = registry.get_instance("fake").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_engine_error_names_the_engine() {
        let registry = EngineRegistry::new(AppConfig::default());
        let err = registry
            .get_instance("no-such-engine")
            .map(|_| ())
            .unwrap_err();
        match err {
            OcrError::UnknownEngine(name) => assert_eq!(name, "no-such-engine"),
            other => panic!("expected UnknownEngine, got {other:?}"),
        }
    }

    #[test]
    fn test_engines_enumeration_forces_no_instantiation() {
        let registry = EngineRegistry::new(AppConfig::default());
        let constructions = Arc::new(AtomicUsize::new(0));
        registry.register(fake_registration("a", "a", constructions.clone()));
        registry.register(fake_registration("b", "b", constructions.clone()));

        let listed = registry.engines();
        assert_eq!(
            listed,
            vec![
                ("a".to_string(), Some("https://example.com/a".to_string())),
                ("b".to_string(), Some("https://example.com/b".to_string())),
            ]
        );
        assert_eq!(constructions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_re_register_overwrites_and_drops_cached_instance() {
        let registry = EngineRegistry::new(AppConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register(fake_registration("fake", "old", counter.clone()));
        let old = registry.get_instance("fake").unwrap();
        assert_eq!(old.name(), "old");

        registry.register(fake_registration("fake", "new", counter.clone()));
        let new = registry.get_instance("fake").unwrap();
        assert_eq!(new.name(), "new");
        assert!(!Arc::ptr_eq(&old, &new));
    }

    #[test]
    fn test_deferred_builtin_registration_on_miss() {
        // Empty registry, but built-in names still resolve. Tesseract
        // chosen because its construction degrades gracefully when the
        // binary is absent.
        let registry = EngineRegistry::new(AppConfig::default());
        assert!(registry.engines().is_empty());

        let engine = registry.get_instance("tesseract").unwrap();
        assert_eq!(engine.name(), "tesseract");
        // Now visible in the table too.
        assert!(registry.engines().iter().any(|(n, _)| n == "tesseract"));
    }

    #[test]
    fn test_builtin_set_is_complete() {
        let registry = EngineRegistry::with_builtin_engines(AppConfig::default());
        let names: Vec<String> = registry.engines().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "easyocr",
                "paddleocr",
                "rapidocr",
                "surya",
                "tesseract",
                "wechat_ocr"
            ]
        );
    }
}

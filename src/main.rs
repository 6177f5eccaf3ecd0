//! anyocr - run any registered OCR engine on an image from the command
//! line, printing structured JSON or plain text.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use anyocr::config::{self, AppConfig};
use anyocr::{EngineRegistry, ImageInput};

/// anyocr - one interface over external OCR engines
#[derive(Parser, Debug)]
#[command(name = "anyocr")]
#[command(about = "Run an OCR engine on an image and print the recognized text")]
struct Args {
    /// Image file to recognize
    image: Option<PathBuf>,

    /// Engine name (defaults to the configured default engine)
    #[arg(short, long)]
    engine: Option<String>,

    /// Comma-separated language codes, e.g. "zh,en" (engines that take a
    /// language list only)
    #[arg(short, long)]
    lang: Option<String>,

    /// Drop items below this confidence before printing
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Print joined text instead of JSON
    #[arg(long)]
    text_only: bool,

    /// Separator used with --text-only
    #[arg(long, default_value = "\n")]
    separator: String,

    /// List registered engines and exit
    #[arg(long)]
    list_engines: bool,

    /// Configuration file path (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = load_or_create_config(args.config.as_deref())?;
    let engine_name = args
        .engine
        .clone()
        .unwrap_or_else(|| config.default_engine.clone());

    if let Some(lang) = &args.lang {
        let languages: Vec<String> = lang.split(',').map(|s| s.trim().to_string()).collect();
        apply_language_override(&mut config, &engine_name, languages);
    }

    let registry = EngineRegistry::with_builtin_engines(config);

    if args.list_engines {
        println!("Registered OCR engines:");
        for (name, project_url) in registry.engines() {
            match project_url {
                Some(url) => println!("  {name:<12} {url}"),
                None => println!("  {name}"),
            }
        }
        return Ok(());
    }

    let image = args
        .image
        .context("no image given (pass an image path, or --list-engines)")?;

    let engine = registry.get_instance(&engine_name)?;
    info!(engine = engine.name(), image = ?image, "running OCR");

    let mut result = engine.ocr(&ImageInput::Path(image))?;
    if let Some(threshold) = args.min_confidence {
        result = result.filter_by_confidence(threshold);
    }

    if args.text_only {
        println!("{}", result.join(&args.separator));
    } else {
        println!("{}", result.to_json()?);
    }

    Ok(())
}

/// Load configuration from the given path, the user config directory, or
/// fall back to defaults when no file exists.
fn load_or_create_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return config::load_config(path)
            .with_context(|| format!("could not load configuration from {path:?}"));
    }
    if let Ok(config_dir) = config::config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
        }
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

/// Point the chosen engine's configuration at a caller-supplied language
/// list. Engines without a language list log and ignore it.
fn apply_language_override(config: &mut AppConfig, engine: &str, languages: Vec<String>) {
    match engine {
        "easyocr" => config.easyocr.languages = languages,
        "surya" => config.surya.languages = languages,
        "tesseract" => config.tesseract.languages = languages,
        // PaddleOCR takes exactly one of its own tokens.
        "paddleocr" => {
            if let Some(first) = languages.into_iter().next() {
                config.paddleocr.lang = first;
            }
        }
        other => tracing::warn!("engine '{other}' takes no language list; --lang ignored"),
    }
}

//! Command line scanner for medicine package photographs.
//!
//! `rxscan scan front.jpg back.jpg` runs the full extraction pipeline and
//! prints the merged record as JSON. `rxscan preprocess` dumps the
//! OCR-normalized rendition of one image for debugging the imaging stage.
//!
//! Configuration comes from `RXSCAN_*` environment variables with flag
//! overrides; build with `--features tesseract` to enable local OCR
//! (without it the vision tier carries the scan alone).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rxscan_core::RawImage;
use rxscan_llm::{ChatClient, LlmConfig, TextModelExtractor, VisionExtractor};
use rxscan_pipeline::{OcrSource, Pipeline};
use tracing::info;

#[derive(Parser)]
#[command(name = "rxscan")]
#[command(about = "Extract a structured record from medicine package photos")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan 2-20 photos of one package and print the merged record
    Scan {
        /// Image files (2-20)
        images: Vec<PathBuf>,

        /// OCR language set (comma, space or plus separated)
        #[arg(long, default_value = rxscan_ocr::DEFAULT_LANGUAGES)]
        langs: String,

        /// Vision model id (overrides RXSCAN_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Text model id (overrides RXSCAN_TEXT_MODEL)
        #[arg(long)]
        text_model: Option<String>,

        /// Chat-completions base URL (overrides RXSCAN_API_BASE)
        #[arg(long)]
        api_base: Option<String>,

        /// Write the record here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Dump the OCR-normalized rendition of one image (stage debugging)
    Preprocess {
        /// Image file
        image: PathBuf,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Scan {
            images,
            langs,
            model,
            text_model,
            api_base,
            out,
        } => scan(images, &langs, model, text_model, api_base, out).await,
        Command::Preprocess { image, out } => preprocess(&image, &out),
    }
}

async fn scan(
    paths: Vec<PathBuf>,
    langs: &str,
    model: Option<String>,
    text_model: Option<String>,
    api_base: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut config = LlmConfig::from_env();
    if let Some(model) = model {
        config.vision_model = model;
    }
    if let Some(model) = text_model {
        config.text_model = model;
    }
    if let Some(base) = api_base {
        config.api_base = base.trim_end_matches('/').to_string();
    }

    let images = paths
        .iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>>>()?;

    let client = ChatClient::new(config);
    let pipeline = Pipeline::new(
        Arc::new(VisionExtractor::new(client.clone())),
        Arc::new(TextModelExtractor::new(client)),
        ocr_source(langs),
    );

    let record = pipeline
        .scan(&images)
        .await
        .context("scan rejected the input")?;

    let json = serde_json::to_string_pretty(&record)?;
    match out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "record written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(feature = "tesseract")]
fn ocr_source(langs: &str) -> Arc<dyn OcrSource> {
    Arc::new(rxscan_ocr::TesseractEngine::new(langs))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_source(langs: &str) -> Arc<dyn OcrSource> {
    let _ = langs;
    info!("built without the tesseract feature; scanning with the vision tier only");
    Arc::new(rxscan_pipeline::NullOcr)
}

fn preprocess(image: &Path, out: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let png = rxscan_ocr::preprocess::prepare_for_ocr(&bytes)?;
    std::fs::write(out, png).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), "preprocessed image written");
    Ok(())
}

fn load_image(path: &Path) -> Result<RawImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "image/jpeg",
    };
    Ok(RawImage::new(bytes, filename, content_type))
}

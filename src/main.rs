mod config;
mod layout;
mod pdf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use config::{LayoutConfig, Settings, load_labels, load_settings_config};
use layout::compose_sheet;
use pdf::{FontResolver, PdfCanvas};

/// Render CSV rows as a sheet of rounded-rectangle labels on A4 PDF pages.
#[derive(Parser, Debug)]
#[command(name = "label_sheet")]
#[command(about = "Render CSV rows as a sheet of rounded-rectangle labels on A4 PDF pages.", long_about = None)]
struct Args {
    /// CSV file with a header row; every following row is one label
    #[arg(short, long, default_value = "labels.csv")]
    input: PathBuf,

    /// Where the PDF is written
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// JSON file overriding label geometry and font sizes
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Font file tried before the built-in search list
    #[arg(short, long)]
    font: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    if !args.input.is_file() {
        return Err(anyhow!("Label CSV not found: {:?}", args.input));
    }

    let settings = match &args.settings {
        Some(path) => {
            info!(path = ?path, "loading settings");
            load_settings_config(path)?
        }
        None => Settings::default(),
    };
    let config = settings
        .apply(LayoutConfig::default())
        .with_context(|| "Invalid layout settings")?;

    let mut font_paths: Vec<PathBuf> = args.font.into_iter().collect();
    font_paths.extend(settings.fonts.iter().cloned());
    let font = FontResolver::new()
        .with_defaults(&font_paths, &settings.font_families)
        .resolve()?;
    info!(font = %font.name, path = ?font.path, "font resolved");

    let labels = load_labels(&args.input)?;
    info!(count = labels.len(), path = ?args.input, "loaded labels");
    if labels.is_empty() {
        warn!("no label rows found; writing a blank page");
    }

    let mut canvas = PdfCanvas::new(&font, font.program(), config.page_width, config.page_height);
    let summary = compose_sheet(&mut canvas, &labels, &config)?;
    let mut doc = canvas.finish()?;

    // Serialize fully before touching the output path.
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .with_context(|| "Failed to serialize PDF")?;
    std::fs::write(&args.output, bytes)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    info!(path = ?args.output, labels = summary.labels, pages = summary.pages, "saved label sheet");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

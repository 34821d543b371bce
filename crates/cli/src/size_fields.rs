//! size-fields - Size fillable form fields from rendered page images
//!
//! Reads a fields JSON document (as produced by the detection stage) and one
//! rendered image per page, and writes the document back with precise,
//! non-overlapping field boxes.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use formfit_core::{FieldSizer, FieldsDocument, OutputFormat, PreRendered, SizingConfig};
use tracing_subscriber::EnvFilter;

/// Output serialization.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Compute precise fillable-field boxes from rendered form pages.
#[derive(Parser, Debug)]
#[command(name = "size-fields")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fields JSON with a `validated_fields` or `fields` array
    fields: PathBuf,

    /// Rendered page images, page 1 first
    #[arg(required = true)]
    pages: Vec<PathBuf>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Output format (inferred from the output file extension when omitted)
    #[arg(short = 'f', long, value_enum)]
    format: Option<Format>,

    /// Sizing configuration file (JSON or YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Resolution the page images were rendered at
    #[arg(long, env = "DEFAULT_DPI")]
    dpi: Option<u32>,

    /// Luminance below which a pixel counts as ink (0-255)
    #[arg(long = "darkness-threshold")]
    darkness_threshold: Option<u8>,

    /// Smallest width or height of a sized field, as a page fraction
    #[arg(long = "min-field-size")]
    min_field_size: Option<f64>,

    /// Box height as a multiple of the text height
    #[arg(long = "padding-factor")]
    padding_factor: Option<f64>,

    /// Worker threads (one page per worker)
    #[arg(short = 'j', long, env = "MAX_WORKERS")]
    threads: Option<usize>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn build_config(args: &Args) -> Result<SizingConfig> {
    let mut config = match &args.config {
        Some(path) => SizingConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => SizingConfig::default(),
    };
    if let Some(dpi) = args.dpi {
        config.dpi = dpi;
    }
    if let Some(t) = args.darkness_threshold {
        config.darkness_threshold = t;
    }
    if let Some(v) = args.min_field_size {
        config.min_field_size = v;
    }
    if let Some(v) = args.padding_factor {
        config.padding_factor = v;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    config.validate()?;
    tracing::debug!(?config, "sizing configuration");
    Ok(config)
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let document = FieldsDocument::from_path(&args.fields)
        .with_context(|| format!("cannot read fields from {}", args.fields.display()))?;
    if document.is_empty() {
        tracing::warn!(path = %args.fields.display(), "no fields to size");
    }

    let pages = PreRendered::from_image_files(&args.pages, config.dpi);
    let sizer = FieldSizer::new(config)?;
    let sized = document.size(&sizer, &pages)?;

    let format = match args.format {
        Some(f) => f.into(),
        None if args.outfile != "-" => OutputFormat::from_path(args.outfile.as_ref()),
        None => OutputFormat::Json,
    };
    if args.outfile == "-" {
        sized.write(BufWriter::new(io::stdout().lock()), format)?;
    } else {
        sized
            .write_to_path(&args.outfile, format)
            .with_context(|| format!("failed to write {}", args.outfile))?;
    }

    let stats = &sized.stats;
    eprintln!(
        "Sized {} fields (avg {:.3} x {:.3}); {} degraded, {} adjusted, {} rejected, {} pages \
         failed",
        stats.total_fields,
        stats.avg_width,
        stats.avg_height,
        stats.degraded_fields,
        stats.adjusted_fields,
        stats.rejected_fields,
        sized.failed_pages.len(),
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

//! lux - linear-light RAW developer
//!
//! Decodes TIFF-based Bayer RAW files, develops them with a parameter
//! preset and writes 8-bit PNGs.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

#[derive(Parser)]
#[command(name = "lux")]
#[command(author, version, about = "Linear-light RAW developer")]
#[command(long_about = "
Develops TIFF-based Bayer RAW files in scene-linear light.

Examples:
  lux info shot.nef                       # Show capture metadata
  lux info shot.nef --yaml                # Metadata as YAML
  lux develop shot.nef -o shot.png        # Develop with as-shot settings
  lux develop shot.nef -p look.yaml --exposure 0.5 --clarity 0.3
  lux develop shot.dng --neutral --dither -o flat.png
  lux preview shot.arw -o thumb.jpg       # Extract embedded JPEG
  lux batch 'card/*.nef' -o out/ -p look.yaml
  lux backends                            # Filter backends and config
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of worker threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show RAW metadata
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Develop a RAW file to PNG
    #[command(visible_alias = "d")]
    Develop(DevelopArgs),

    /// Extract the embedded preview
    #[command(visible_alias = "p")]
    Preview(PreviewArgs),

    /// Develop every file matching a glob pattern
    #[command(visible_alias = "b")]
    Batch(BatchArgs),

    /// List bilateral filter backends and the effective configuration
    Backends(BackendsArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input RAW file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Print metadata as YAML
    #[arg(long)]
    yaml: bool,

    /// Also print the parameters seeded from the metadata
    #[arg(short, long)]
    seed: bool,
}

/// Slider overrides applied on top of the preset.
#[derive(Args, Debug, Default, Clone)]
struct SliderArgs {
    /// Exposure in EV
    #[arg(long, allow_negative_numbers = true)]
    exposure: Option<f32>,

    /// Contrast multiplier (1 = neutral)
    #[arg(long)]
    contrast: Option<f32>,

    /// Saturation (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    saturation: Option<f32>,

    /// Vibrance (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    vibrance: Option<f32>,

    /// Temperature, positive is warmer (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    temperature: Option<f32>,

    /// Tint, positive is more magenta (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    tint: Option<f32>,

    /// Highlights (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    highlights: Option<f32>,

    /// Shadows (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    shadows: Option<f32>,

    /// Whites (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    whites: Option<f32>,

    /// Blacks (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    blacks: Option<f32>,

    /// Clarity (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    clarity: Option<f32>,

    /// Texture (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    texture: Option<f32>,

    /// Dehaze (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    dehaze: Option<f32>,

    /// Vignette, negative darkens corners (-1..1)
    #[arg(long, allow_negative_numbers = true)]
    vignette: Option<f32>,

    /// Grain (0..1)
    #[arg(long)]
    grain: Option<f32>,

    /// Grain seed
    #[arg(long)]
    grain_seed: Option<u64>,

    /// Sharpening (0..1)
    #[arg(long)]
    sharpening: Option<f32>,

    /// Noise reduction (0..1)
    #[arg(long)]
    noise_reduction: Option<f32>,

    /// Floyd-Steinberg dithering before quantization
    #[arg(long)]
    dither: bool,

    /// Roll off highlights instead of clipping
    #[arg(long)]
    soft_clip: bool,
}

#[derive(Args)]
struct DevelopArgs {
    /// Input RAW file
    input: PathBuf,

    /// Output PNG (default: input name with .png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML parameter preset
    #[arg(short, long)]
    preset: Option<PathBuf>,

    /// Start from neutral parameters instead of metadata-seeded ones
    #[arg(long, conflicts_with = "preset")]
    neutral: bool,

    /// Write the effective parameters to this YAML file
    #[arg(long)]
    save_preset: Option<PathBuf>,

    /// Print per-stage timings
    #[arg(short, long)]
    timings: bool,

    #[command(flatten)]
    sliders: SliderArgs,
}

#[derive(Args)]
struct PreviewArgs {
    /// Input RAW file
    input: PathBuf,

    /// Output file (default: input name with .jpg, or .png with --png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decode the preview and write a PNG instead of the raw JPEG
    #[arg(long)]
    png: bool,
}

#[derive(Args)]
struct BatchArgs {
    /// Input glob pattern (e.g. "card/*.nef")
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: PathBuf,

    /// YAML parameter preset
    #[arg(short, long)]
    preset: Option<PathBuf>,

    /// Start from neutral parameters instead of metadata-seeded ones
    #[arg(long, conflicts_with = "preset")]
    neutral: bool,

    /// Keep going after a failed file
    #[arg(short = 'k', long)]
    keep_going: bool,

    #[command(flatten)]
    sliders: SliderArgs,
}

#[derive(Args)]
struct BackendsArgs {
    /// Print the filter configuration as YAML
    #[arg(long)]
    yaml: bool,
}

/// Installs the global subscriber. The guard flushes the log file on drop.
fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console = fmt::layer().with_target(verbose > 1).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console.with_filter(filter()))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_ref())?;

    // Configure the pool used to fan out batch files
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Develop(args) => commands::develop::run(args, cli.threads),
        Commands::Preview(args) => commands::preview::run(args),
        Commands::Batch(args) => commands::batch::run(args, cli.threads, cli.verbose),
        Commands::Backends(args) => commands::backends::run(args),
    }
}

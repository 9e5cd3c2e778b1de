//! CLI command implementations

pub mod backends;
pub mod batch;
pub mod develop;
pub mod info;
pub mod preview;

use anyhow::{Context, Result};
use lux_core::OutputImage;
use lux_pipeline::{ParameterSet, Pipeline};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::SliderArgs;

/// Builds a pipeline on the shared filter engine.
///
/// `threads == 0` keeps the global worker pool.
pub fn build_pipeline(threads: usize) -> Result<Pipeline> {
    let mut builder = Pipeline::builder();
    if threads > 0 {
        builder = builder.workers(threads);
    }
    builder.build().context("Failed to create pipeline")
}

/// Starting parameters for one file: the preset if given, otherwise
/// neutral or seeded from the file's metadata.
pub fn base_params(input: &Path, preset: Option<&ParameterSet>, neutral: bool) -> Result<ParameterSet> {
    if let Some(p) = preset {
        return Ok(p.clone());
    }
    if neutral {
        return Ok(ParameterSet::default());
    }
    let meta = lux_raw::read_metadata(input)
        .with_context(|| format!("Failed to read metadata: {}", input.display()))?;
    Ok(ParameterSet::from_metadata(&meta))
}

/// Loads a preset file.
pub fn load_preset(path: Option<&PathBuf>) -> Result<Option<ParameterSet>> {
    path.map(|p| ParameterSet::load(p).with_context(|| format!("Failed to load preset: {}", p.display())))
        .transpose()
}

/// Overlays command-line sliders onto `params`.
pub fn apply_sliders(params: &mut ParameterSet, s: &SliderArgs) {
    macro_rules! overlay {
        ($($field:ident),*) => {
            $(
                if let Some(v) = s.$field {
                    params.$field = v;
                }
            )*
        };
    }
    overlay!(
        exposure,
        contrast,
        saturation,
        vibrance,
        temperature,
        tint,
        highlights,
        shadows,
        whites,
        blacks,
        clarity,
        texture,
        dehaze,
        vignette,
        grain,
        grain_seed,
        sharpening,
        noise_reduction
    );
    if s.dither {
        params.display.dither = true;
    }
    if s.soft_clip {
        params.display.soft_clip = true;
    }
}

/// Writes an RGBA buffer as an 8-bit sRGB PNG.
pub fn write_png(path: &Path, image: &OutputImage) -> Result<()> {
    write_rgba_png(path, image.width(), image.height(), image.as_bytes())
}

/// Writes raw RGBA bytes as an 8-bit sRGB PNG.
pub fn write_rgba_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::default());
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("Failed to write PNG header: {}", path.display()))?;
    writer
        .write_image_data(rgba)
        .with_context(|| format!("Failed to write PNG data: {}", path.display()))?;
    debug!(path = %path.display(), width, height, "png written");
    Ok(())
}

/// `input` with its extension replaced, placed in `dir` when given.
pub fn derived_path(input: &Path, dir: Option<&Path>, ext: &str) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let name = format!("{}.{}", stem, ext);
    match dir {
        Some(d) => d.join(name),
        None => input.with_file_name(name),
    }
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

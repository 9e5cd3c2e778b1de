//! Single-file development.

use crate::DevelopArgs;
use anyhow::{Context, Result};
use tracing::{info, trace, warn};

/// Develops one RAW file to PNG.
pub fn run(args: DevelopArgs, threads: usize) -> Result<()> {
    trace!(input = %args.input.display(), "develop::run");
    let preset = super::load_preset(args.preset.as_ref())?;
    let mut params = super::base_params(&args.input, preset.as_ref(), args.neutral)?;
    super::apply_sliders(&mut params, &args.sliders);
    let params = params.sanitized();

    if let Some(path) = &args.save_preset {
        params
            .save(path)
            .with_context(|| format!("Failed to save preset: {}", path.display()))?;
        info!(path = %path.display(), "preset saved");
    }

    let pipeline = super::build_pipeline(threads)?;
    let dev = pipeline
        .develop_file(&args.input, &params)
        .with_context(|| format!("Failed to develop: {}", args.input.display()))?;
    if dev.metadata.synthetic {
        warn!(input = %args.input.display(), "sensor data not decodable, wrote a placeholder");
    }

    let output = args
        .output
        .unwrap_or_else(|| super::derived_path(&args.input, None, "png"));
    super::write_png(&output, &dev.image)?;

    println!(
        "{} -> {} ({}x{}, {:.1} ms)",
        args.input.display(),
        output.display(),
        dev.image.width(),
        dev.image.height(),
        dev.timings.total().as_secs_f64() * 1e3
    );
    if args.timings {
        for (stage, d) in dev.timings.entries() {
            println!("  {:<16} {:>9.3} ms", stage.name(), d.as_secs_f64() * 1e3);
        }
        let stats = pipeline.engine().stats();
        println!("  filter cache: {} hits, {} misses", stats.hits, stats.misses);
    }
    Ok(())
}

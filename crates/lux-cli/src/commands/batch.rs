//! Batch development.

use crate::BatchArgs;
use anyhow::{Context, Result, bail};
use lux_pipeline::{ParameterSet, Pipeline};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, trace};

/// Develops every file matching the pattern into the output directory.
///
/// Files run in parallel and share one filter engine.
pub fn run(args: BatchArgs, threads: usize, verbose: u8) -> Result<()> {
    trace!(pattern = %args.input, "batch::run");

    let files: Vec<PathBuf> = glob::glob(&args.input)
        .with_context(|| format!("Invalid pattern: {}", args.input))?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    if files.is_empty() {
        bail!("No files match pattern: {}", args.input);
    }
    info!(files = files.len(), pattern = %args.input, "starting batch");

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create: {}", args.output_dir.display()))?;
    let preset = super::load_preset(args.preset.as_ref())?;
    let pipeline = super::build_pipeline(threads)?;
    let stop = AtomicBool::new(false);

    let results: Vec<(PathBuf, Result<PathBuf>)> = files
        .par_iter()
        .map(|input| {
            if stop.load(Ordering::Relaxed) {
                return (input.clone(), Err(anyhow::anyhow!("skipped after earlier failure")));
            }
            let r = develop_one(&pipeline, input, &args, preset.as_ref());
            if r.is_err() && !args.keep_going {
                stop.store(true, Ordering::Relaxed);
            }
            (input.clone(), r)
        })
        .collect();

    let mut success = 0;
    let mut failed = 0;
    for (input, r) in results {
        match r {
            Ok(output) => {
                success += 1;
                if verbose > 0 {
                    println!("{} -> {}", input.display(), output.display());
                }
            }
            Err(e) => {
                failed += 1;
                error!(input = %input.display(), "{:#}", e);
            }
        }
    }

    let stats = pipeline.engine().stats();
    debug!(hits = stats.hits, misses = stats.misses, evictions = stats.evictions, "filter cache");
    info!(success, failed, "batch complete");
    println!("Processed: {} success, {} failed", success, failed);

    if failed > 0 {
        bail!("{} files failed", failed);
    }
    Ok(())
}

fn develop_one(pipeline: &Pipeline, input: &Path, args: &BatchArgs, preset: Option<&ParameterSet>) -> Result<PathBuf> {
    let mut params = super::base_params(input, preset, args.neutral)?;
    super::apply_sliders(&mut params, &args.sliders);
    let dev = pipeline
        .develop_file(input, &params.sanitized())
        .with_context(|| format!("Failed to develop: {}", input.display()))?;
    let output = super::derived_path(input, Some(&args.output_dir), "png");
    super::write_png(&output, &dev.image)?;
    Ok(output)
}

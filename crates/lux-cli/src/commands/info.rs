//! RAW metadata command.

use crate::InfoArgs;
use anyhow::{Context, Result};
use lux_core::RawMetadata;
use lux_pipeline::ParameterSet;
use lux_raw::Detection;
use std::fs;
use std::path::Path;
use tracing::trace;

/// Prints metadata for each input.
pub fn run(args: InfoArgs, verbose: u8) -> Result<()> {
    for (i, path) in args.input.iter().enumerate() {
        trace!(path = %path.display(), "info::run");
        if i > 0 {
            println!();
        }
        let file_size = fs::metadata(path)
            .with_context(|| format!("Failed to stat: {}", path.display()))?
            .len();
        let meta = lux_raw::read_metadata(path).with_context(|| format!("Failed to read: {}", path.display()))?;

        if args.yaml {
            let text = serde_yaml::to_string(&meta).context("Failed to serialize metadata")?;
            println!("# {}", path.display());
            print!("{}", text);
        } else {
            print_text(path, &meta, file_size, verbose);
        }

        if args.seed {
            let params = ParameterSet::from_metadata(&meta);
            println!(
                "  Seeded:     temperature {:+.3}, tint {:+.3}, noise reduction {:.3}",
                params.temperature, params.tint, params.noise_reduction
            );
        }
    }
    Ok(())
}

fn print_text(path: &Path, meta: &RawMetadata, file_size: u64, verbose: u8) {
    println!("{}", path.display());
    println!("  Camera:     {}", if meta.camera_model.is_empty() { "unknown" } else { meta.camera_model.as_str() });
    println!("  Resolution: {}x{}", meta.width, meta.height);
    println!("  Bits:       {}", meta.bits_per_sample);
    println!("  CFA:        {}", meta.cfa_pattern.name());
    println!("  ISO:        {}", meta.iso);
    println!("  Shutter:    {}", meta.shutter_speed());
    if meta.aperture > 0.0 {
        println!("  Aperture:   f/{:.1}", meta.aperture);
    }
    if meta.focal_length > 0.0 {
        println!("  Focal:      {:.0} mm", meta.focal_length);
    }
    println!("  File size:  {}", super::format_size(file_size));
    if meta.synthetic {
        println!("  Note:       sensor data not decodable, a placeholder would be used");
    }

    if verbose > 0 {
        println!("  Levels:     black {} / white {}", meta.black_level, meta.white_level);
        println!("  WB:         {:.0} K, tint {:+.2}", meta.white_balance.temperature, meta.white_balance.tint);
        println!("  Colour:     {}", meta.color_space);
        if let Ok(bytes) = fs::read(path) {
            let detection = Detection::detect(&bytes, Some(path));
            println!("  Detected:   {:?}", detection);
        }
    }
}

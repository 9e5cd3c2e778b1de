//! Embedded preview extraction.

use crate::PreviewArgs;
use anyhow::{Context, Result, bail};
use std::fs;
use tracing::{info, trace};

/// Writes the embedded JPEG, or a PNG decoded from it.
pub fn run(args: PreviewArgs) -> Result<()> {
    trace!(input = %args.input.display(), "preview::run");
    let data = fs::read(&args.input).with_context(|| format!("Failed to read: {}", args.input.display()))?;
    let Some(jpeg) = lux_raw::extract_preview(&data) else {
        bail!("No embedded preview in {}", args.input.display());
    };

    if args.png {
        let output = args
            .output
            .unwrap_or_else(|| super::derived_path(&args.input, None, "png"));
        let preview = lux_raw::decode_preview(jpeg).context("Failed to decode preview")?;
        super::write_rgba_png(&output, preview.width, preview.height, &preview.rgba)?;
        info!(output = %output.display(), width = preview.width, height = preview.height, "preview decoded");
        println!("{} -> {} ({}x{})", args.input.display(), output.display(), preview.width, preview.height);
    } else {
        let output = args
            .output
            .unwrap_or_else(|| super::derived_path(&args.input, None, "jpg"));
        fs::write(&output, jpeg).with_context(|| format!("Failed to write: {}", output.display()))?;
        info!(output = %output.display(), bytes = jpeg.len(), "preview extracted");
        println!("{} -> {} ({})", args.input.display(), output.display(), super::format_size(jpeg.len() as u64));
    }
    Ok(())
}

//! Writes a synthetic 14-bit Bayer file for trying the `lux` CLI.
//!
//! Usage: make_fixture <output.dng> [width] [height] [seed]

use lux_tests::fixtures::{bayer_tiff, scene_bayer};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(output) = args.get(1) else {
        eprintln!("usage: make_fixture <output.dng> [width] [height] [seed]");
        std::process::exit(2);
    };
    let arg = |i: usize, default: u64| args.get(i).and_then(|s| s.parse().ok()).unwrap_or(default);
    let width = arg(2, 640) as u32;
    let height = arg(3, 480) as u32;
    let seed = arg(4, 1);

    let bytes = bayer_tiff(width, height, &scene_bayer(width, height, seed));
    if let Err(e) = std::fs::write(output, &bytes) {
        eprintln!("failed to write {}: {}", output, e);
        std::process::exit(1);
    }
    println!("{} ({}x{}, {} bytes)", output, width, height, bytes.len());
}

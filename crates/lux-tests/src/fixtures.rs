//! Synthetic inputs shared by the end-to-end tests and the fixture tool.

use std::path::{Path, PathBuf};

use lux_core::{LinearImage, OutputImage};
use lux_raw::BayerTiffWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh64::xxh64;

/// 14-bit black and white levels.
pub const LEVELS_14: (u32, u32) = (512, 16383);

/// Baseline greyscale JPEG, 16x8: left 8x8 block 200, right block 50.
pub const GREY_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x08,
    0x00, 0x10, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00, 0x16, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x0B, 0xFF, 0xC4,
    0x00, 0x14, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0x64, 0x04,
    0xD3, 0xDF, 0xFF, 0xD9,
];

/// A uniform Bayer mosaic.
pub fn flat_bayer(width: u32, height: u32, value: u16) -> Vec<u16> {
    vec![value; width as usize * height as usize]
}

/// A smooth RGGB scene (colour ramps and a bright disc) with a little
/// sensor noise, as 14-bit samples.
pub fn scene_bayer(width: u32, height: u32, seed: u64) -> Vec<u16> {
    let (black, white) = LEVELS_14;
    let span = (white - black) as f32;
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = (width as usize, height as usize);
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let u = x as f32 / w.max(2) as f32;
            let v = y as f32 / h.max(2) as f32;
            let dx = u - 0.6;
            let dy = v - 0.4;
            let disc = if dx * dx + dy * dy < 0.02 { 0.5 } else { 0.0 };
            let rgb = [0.05 + 0.6 * u + disc, 0.08 + 0.5 * v + disc, 0.1 + 0.3 * (1.0 - u) + disc];
            let c = match (y & 1, x & 1) {
                (0, 0) => 0,
                (1, 1) => 2,
                _ => 1,
            };
            let noise: f32 = rng.gen_range(-0.004..0.004);
            let level = (rgb[c] + noise).clamp(0.0, 1.0);
            out.push(black as u16 + (level * span) as u16);
        }
    }
    out
}

/// Encodes `samples` as a 14-bit RGGB DNG-style TIFF.
pub fn bayer_tiff(width: u32, height: u32, samples: &[u16]) -> Vec<u8> {
    BayerTiffWriter::new(width, height)
        .make("lux")
        .model("Synthetic Sensor")
        .iso(200)
        .exposure(1, 125)
        .aperture(28, 10)
        .focal_length(50, 1)
        .levels(LEVELS_14.0, LEVELS_14.1)
        .build(samples)
}

/// Writes `bytes` to `dir/name`.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Scene-linear test image with ramps in every channel.
pub fn scene_image(width: u32, height: u32) -> LinearImage {
    LinearImage::from_fn(width, height, |x, y| {
        let u = x as f32 / width.max(2) as f32;
        let v = y as f32 / height.max(2) as f32;
        [0.02 + 0.9 * u, 0.02 + 0.7 * v, 0.05 + 0.4 * u * v]
    })
}

/// xxh64 of a display buffer.
pub fn output_hash(image: &OutputImage) -> u64 {
    xxh64(image.as_bytes(), 0)
}

//! Linear to display conversion.
//!
//! Produces 8-bit sRGB-encoded RGBA (alpha 255), row-major, no padding.
//! Work is split into row bands on the worker pool.
//!
//! # Options
//!
//! - **Soft clip**: values below `threshold` pass through, a Hermite
//!   blend over `knee` hands over to a tanh shoulder that approaches but
//!   never reaches 1.0.
//! - **Dither**: Floyd-Steinberg error diffusion in the encoded domain.
//!   Error diffuses within each worker's row band.
//!
//! [`display_to_linear`] is the inverse for 8-bit buffers such as
//! embedded previews.

use lux_core::{Error, LinearImage, OutputImage, Result, WorkerPool, smoothstep};
use lux_transfer::srgb;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Soft clip output ceiling.
pub const SOFT_CLIP_CEILING: f32 = 1.0 - 1e-4;

/// Display conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Floyd-Steinberg dithering before quantization
    pub dither: bool,
    /// Roll off highlights instead of hard clipping
    pub soft_clip: bool,
    /// Start of the shoulder in linear light
    pub soft_clip_threshold: f32,
    /// Width of the blend into the shoulder
    pub soft_clip_knee: f32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            dither: false,
            soft_clip: false,
            soft_clip_threshold: 0.8,
            soft_clip_knee: 0.1,
        }
    }
}

impl DisplayOptions {
    fn shoulder(&self) -> Option<(f32, f32)> {
        self.soft_clip.then(|| {
            let t = self.soft_clip_threshold.clamp(0.05, 0.99);
            let k = self.soft_clip_knee.clamp(1e-3, 1.0);
            (t, k)
        })
    }
}

/// Highlight roll-off for one value.
///
/// ```text
/// x <= t           x
/// t < x < t + k    lerp(x, shoulder(x), smoothstep(t, t + k, x))
/// x >= t + k       shoulder(x) = t + (1 - t) * tanh((x - t) / (1 - t))
/// ```
#[inline]
pub fn soft_clip(x: f32, threshold: f32, knee: f32) -> f32 {
    if x <= threshold {
        return x;
    }
    let span = 1.0 - threshold;
    let shoulder = threshold + span * ((x - threshold) / span).tanh();
    let s = smoothstep(threshold, threshold + knee, x);
    (x + (shoulder - x) * s).min(SOFT_CLIP_CEILING)
}

#[inline]
fn prepare(v: f32, shoulder: Option<(f32, f32)>) -> f32 {
    match shoulder {
        Some((t, k)) => soft_clip(v, t, k),
        None => v,
    }
}

/// Converts to a new RGBA buffer.
pub fn linear_to_display(image: &LinearImage, options: &DisplayOptions, pool: &WorkerPool) -> OutputImage {
    let mut out = OutputImage::new(image.width(), image.height());
    linear_to_display_into(image, &mut out, options, pool);
    out
}

/// Converts into `out`, reallocating it if its size does not match.
pub fn linear_to_display_into(
    image: &LinearImage,
    out: &mut OutputImage,
    options: &DisplayOptions,
    pool: &WorkerPool,
) {
    let (w, h) = image.dimensions();
    if out.ensure_size(w, h) {
        debug!(width = w, height = h, "display buffer reallocated");
    }
    if image.is_empty() {
        return;
    }
    let width = w as usize;
    let shoulder = options.shoulder();
    let (r, g, b) = image.planes();
    let planes = [r, g, b];
    let row_len = width * OutputImage::CHANNELS;

    if options.dither {
        pool.for_each_row_chunk(out.as_bytes_mut(), row_len, |rows, chunk| {
            dither_band(&planes, width, rows.start, chunk, shoulder);
        });
    } else {
        pool.for_each_row_chunk(out.as_bytes_mut(), row_len, |rows, chunk| {
            let base = rows.start * width;
            for (i, px) in chunk.chunks_exact_mut(OutputImage::CHANNELS).enumerate() {
                let j = base + i;
                for c in 0..3 {
                    px[c] = srgb::encode_u8(prepare(planes[c][j], shoulder));
                }
                px[3] = 255;
            }
        });
    }
}

/// Floyd-Steinberg over one band. `chunk` holds the band's RGBA rows.
fn dither_band(planes: &[&[f32]; 3], width: usize, first_row: usize, chunk: &mut [u8], shoulder: Option<(f32, f32)>) {
    let rows = chunk.len() / (width * OutputImage::CHANNELS);
    // error rows padded by one on each side
    let mut cur = vec![[0.0f32; 3]; width + 2];
    let mut next = vec![[0.0f32; 3]; width + 2];
    for ry in 0..rows {
        let base = (first_row + ry) * width;
        for x in 0..width {
            let o = (ry * width + x) * OutputImage::CHANNELS;
            for c in 0..3 {
                let v = srgb::encode_unquantized(prepare(planes[c][base + x], shoulder)) + cur[x + 1][c];
                let q = v.round().clamp(0.0, 255.0);
                chunk[o + c] = q as u8;
                let err = v - q;
                cur[x + 2][c] += err * 7.0 / 16.0;
                next[x][c] += err * 3.0 / 16.0;
                next[x + 1][c] += err * 5.0 / 16.0;
                next[x + 2][c] += err * 1.0 / 16.0;
            }
            chunk[o + 3] = 255;
        }
        std::mem::swap(&mut cur, &mut next);
        next.iter_mut().for_each(|e| *e = [0.0; 3]);
    }
}

/// Decodes 8-bit sRGB RGBA back to linear light. Alpha is ignored.
pub fn display_to_linear(rgba: &[u8], width: u32, height: u32) -> Result<LinearImage> {
    let n = width as usize * height as usize;
    if rgba.len() != n * OutputImage::CHANNELS {
        return Err(Error::invalid_dimensions(
            width,
            height,
            format!("expected {} RGBA bytes, got {}", n * OutputImage::CHANNELS, rgba.len()),
        ));
    }
    let lut = srgb::decode_table();
    let mut r = Vec::with_capacity(n);
    let mut g = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for px in rgba.chunks_exact(OutputImage::CHANNELS) {
        r.push(lut[px[0] as usize]);
        g.push(lut[px[1] as usize]);
        b.push(lut[px[2] as usize]);
    }
    LinearImage::from_planes(width, height, r, g, b)
}

/// Converts an [`OutputImage`] back to linear light.
pub fn output_to_linear(image: &OutputImage) -> Result<LinearImage> {
    display_to_linear(image.as_bytes(), image.width(), image.height())
}

//! Luminance unsharp mask.
//!
//! ```text
//! Y'  = Y + gain * (Y - gaussian(Y))
//! rgb = rgb * Y' / Y
//! ```
//!
//! Only luminance is sharpened, so colour edges do not fringe.

use lux_core::{LinearImage, WorkerPool, rescale_luminance};
use tracing::trace;

use crate::EPSILON;
use crate::blur::{blur_plane, luminance_plane};

/// Blur radius of the mask, in pixels.
pub const SHARPEN_SIGMA: f32 = 1.0;

/// Detail gain at `amount = 1`.
pub const MAX_GAIN: f32 = 2.0;

/// Sharpens by `amount` in [0, 1].
pub fn apply_sharpening(image: &mut LinearImage, amount: f32, pool: &WorkerPool) {
    if amount.abs() < EPSILON || image.is_empty() {
        return;
    }
    let gain = amount.clamp(0.0, 1.0) * MAX_GAIN;
    let (w, h) = image.dimensions();
    let luma = luminance_plane(image);
    let blurred = blur_plane(&luma, w as usize, h as usize, SHARPEN_SIGMA, pool);
    trace!(gain, "unsharp mask");

    pool.for_each_rows(image, |mut band| {
        let base = band.rows.start * band.width;
        for i in 0..band.len() {
            let y = luma[base + i];
            if y <= 1e-6 {
                continue;
            }
            let target = (y + gain * (y - blurred[base + i])).max(0.0);
            let out = rescale_luminance(band.get(i), y, target);
            band.set(i, out);
        }
    });
}

//! Vignette and film grain.

use lux_core::{LinearImage, WorkerPool, luminance_rec709, rescale_luminance, smoothstep};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use tracing::trace;

use crate::EPSILON;

/// Normalized radius where the vignette starts.
pub const VIGNETTE_INNER: f32 = 0.25;

/// Stops of exposure change in the corners at `amount = +/-1`.
pub const VIGNETTE_STOPS: f32 = 1.5;

/// Photons per unit luminance at the lowest grain setting.
pub const GRAIN_PHOTONS_FINE: f32 = 4000.0;

/// Photons per unit luminance at full grain.
pub const GRAIN_PHOTONS_COARSE: f32 = 40.0;

/// Vignette falloff at pixel `(x, y)`: 0 in the centre, 1 in the corners.
#[inline]
pub fn vignette_falloff(x: u32, y: u32, width: u32, height: u32) -> f32 {
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;
    let dx = (x as f32 + 0.5 - cx) / cx.max(0.5);
    let dy = (y as f32 + 0.5 - cy) / cy.max(0.5);
    let r = (dx * dx + dy * dy).sqrt() / std::f32::consts::SQRT_2;
    smoothstep(VIGNETTE_INNER, 1.0, r)
}

/// Radial exposure falloff. Negative `amount` darkens corners.
pub fn apply_vignette(image: &mut LinearImage, amount: f32, pool: &WorkerPool) {
    if amount.abs() < EPSILON {
        return;
    }
    let amount = amount.clamp(-1.0, 1.0);
    let (w, h) = image.dimensions();
    trace!(amount, "vignette");
    pool.map_pixels_xy(image, |x, y, [r, g, b]| {
        let gain = (amount * vignette_falloff(x, y, w, h) * VIGNETTE_STOPS).exp2();
        [r * gain, g * gain, b * gain]
    });
}

/// Photon count per unit luminance for a grain amount in [0, 1].
#[inline]
pub fn grain_photons(amount: f32) -> f32 {
    let a = amount.clamp(0.0, 1.0);
    // geometric interpolation keeps the slider perceptually even
    GRAIN_PHOTONS_FINE * (GRAIN_PHOTONS_COARSE / GRAIN_PHOTONS_FINE).powf(a)
}

/// RNG seed for image row `row`.
#[inline]
pub fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Poisson photon noise on luminance.
///
/// Each row draws from its own generator seeded by `seed` and the row
/// index, so output does not depend on the worker count.
pub fn apply_grain(image: &mut LinearImage, amount: f32, seed: u64, pool: &WorkerPool) {
    if amount < EPSILON {
        return;
    }
    let photons = grain_photons(amount);
    trace!(amount, photons, seed, "grain");
    pool.for_each_rows(image, |mut band| {
        let width = band.width;
        for (k, row) in band.rows.clone().enumerate() {
            let mut rng = StdRng::seed_from_u64(row_seed(seed, row));
            for i in k * width..(k + 1) * width {
                let rgb = band.get(i);
                let y = luminance_rec709(rgb);
                let lambda = y * photons;
                if !(lambda > 0.0 && lambda.is_finite()) {
                    continue;
                }
                let Ok(dist) = Poisson::new(lambda) else {
                    continue;
                };
                let sample: f32 = dist.sample(&mut rng);
                band.set(i, rescale_luminance(rgb, y, sample / photons));
            }
        }
    });
}

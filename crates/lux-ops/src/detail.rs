//! Clarity, texture and noise reduction.
//!
//! All three go through the shared [`FilterEngine`], so repeated slider
//! moves over unchanged content hit its cache.
//!
//! | Kernel | Spatial sigma | Range sigma | Operation |
//! |--------|---------------|-------------|-----------|
//! | clarity | 8 | 0.15 | add midtone-weighted detail |
//! | texture | 2 | 0.08 | add fine detail |
//! | noise reduction | 1 to 3 | scaled by amount | blend toward smoothed |

use lux_core::{LinearImage, WorkerPool, lerp, luminance_rec709};
use lux_filter::FilterEngine;
use lux_transfer::lstar;
use tracing::debug;

use crate::EPSILON;

/// Clarity filter spatial sigma.
pub const CLARITY_SPATIAL_SIGMA: f32 = 8.0;
/// Clarity filter range sigma.
pub const CLARITY_RANGE_SIGMA: f32 = 0.15;
/// Texture filter spatial sigma.
pub const TEXTURE_SPATIAL_SIGMA: f32 = 2.0;
/// Texture filter range sigma.
pub const TEXTURE_RANGE_SIGMA: f32 = 0.08;

/// Bell over lightness: 1 at L* = 50, 0 at black and white.
#[inline]
pub fn midtone_weight(rgb: [f32; 3]) -> f32 {
    let l = (lstar::from_luminance(luminance_rec709(rgb)) / 100.0).clamp(0.0, 1.0);
    let d = 2.0 * l - 1.0;
    1.0 - d * d
}

fn add_detail(image: &mut LinearImage, detail: &LinearImage, amount: f32, midtones: bool, pool: &WorkerPool) {
    let (dr, dg, db) = detail.planes();
    pool.for_each_rows(image, |mut band| {
        let base = band.rows.start * band.width;
        for i in 0..band.len() {
            let j = base + i;
            let rgb = band.get(i);
            let k = if midtones { amount * midtone_weight(rgb) } else { amount };
            band.set(
                i,
                [
                    (rgb[0] + k * dr[j]).max(0.0),
                    (rgb[1] + k * dg[j]).max(0.0),
                    (rgb[2] + k * db[j]).max(0.0),
                ],
            );
        }
    });
}

/// Local midtone contrast; `amount` in [-1, 1].
pub fn apply_clarity(image: &mut LinearImage, amount: f32, engine: &FilterEngine, pool: &WorkerPool) {
    if amount.abs() < EPSILON || image.is_empty() {
        return;
    }
    let detail = engine.extract_detail(image, CLARITY_SPATIAL_SIGMA, CLARITY_RANGE_SIGMA);
    debug!(amount, "clarity");
    add_detail(image, &detail, amount.clamp(-1.0, 1.0), true, pool);
}

/// Fine detail boost or smoothing; `amount` in [-1, 1].
pub fn apply_texture(image: &mut LinearImage, amount: f32, engine: &FilterEngine, pool: &WorkerPool) {
    if amount.abs() < EPSILON || image.is_empty() {
        return;
    }
    let detail = engine.extract_detail(image, TEXTURE_SPATIAL_SIGMA, TEXTURE_RANGE_SIGMA);
    debug!(amount, "texture");
    add_detail(image, &detail, amount.clamp(-1.0, 1.0), false, pool);
}

/// Filter sigmas `(spatial, range)` for a noise reduction amount.
#[inline]
pub fn noise_reduction_sigmas(amount: f32) -> (f32, f32) {
    let a = amount.clamp(0.0, 1.0);
    (1.0 + 2.0 * a, 0.02 + 0.1 * a)
}

/// Edge-preserving smoothing; `amount` in [0, 1].
pub fn apply_noise_reduction(image: &mut LinearImage, amount: f32, engine: &FilterEngine, pool: &WorkerPool) {
    if amount < EPSILON || image.is_empty() {
        return;
    }
    let a = amount.min(1.0);
    let (spatial, range) = noise_reduction_sigmas(a);
    let smooth = engine.apply_cached(image, spatial, range);
    debug!(amount = a, spatial, range, "noise reduction");
    let (sr, sg, sb) = smooth.planes();
    pool.for_each_rows(image, |mut band| {
        let base = band.rows.start * band.width;
        for i in 0..band.len() {
            let j = base + i;
            let [r, g, b] = band.get(i);
            band.set(i, [lerp(r, sr[j], a), lerp(g, sg[j], a), lerp(b, sb[j], a)]);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_filter::{FilterConfig, NullGpu};

    fn engine() -> FilterEngine {
        FilterEngine::with_gpu(FilterConfig::default(), Box::new(NullGpu))
    }

    fn noisy() -> LinearImage {
        LinearImage::from_fn(24, 24, |x, y| {
            let n = ((x * 7 + y * 13) % 5) as f32 * 0.01;
            [0.3 + n, 0.3 + n, 0.3 + n]
        })
    }

    #[test]
    fn zero_amounts_skip_filtering() {
        let e = engine();
        let src = noisy();
        let mut img = src.clone();
        let pool = WorkerPool::global();
        apply_clarity(&mut img, 0.0, &e, pool);
        apply_texture(&mut img, 0.0, &e, pool);
        apply_noise_reduction(&mut img, 0.0, &e, pool);
        assert_eq!(img, src);
        assert_eq!(e.stats().misses, 0);
    }

    #[test]
    fn noise_reduction_lowers_variance() {
        let e = engine();
        let src = noisy();
        let mut img = src.clone();
        apply_noise_reduction(&mut img, 1.0, &e, WorkerPool::global());
        let var = |im: &LinearImage| {
            let m = im.mean()[0];
            im.red().iter().map(|v| (v - m) * (v - m)).sum::<f32>()
        };
        assert!(var(&img) < var(&src));
    }

    #[test]
    fn clarity_uses_cache_on_repeat() {
        let e = engine();
        let src = noisy();
        let mut a = src.clone();
        let mut b = src.clone();
        apply_clarity(&mut a, 0.5, &e, WorkerPool::global());
        apply_clarity(&mut b, 0.5, &e, WorkerPool::global());
        assert_eq!(a, b);
        assert_eq!(e.stats().hits, 1);
    }

    #[test]
    fn midtone_weight_peaks_at_mid_grey() {
        let mid = lstar::to_luminance(50.0);
        assert!((midtone_weight([mid; 3]) - 1.0).abs() < 1e-4);
        assert!(midtone_weight([0.0; 3]) < 1e-6);
        assert!(midtone_weight([1.0; 3]) < 1e-4);
    }

    #[test]
    fn sigmas_scale_with_amount() {
        assert_eq!(noise_reduction_sigmas(0.0), (1.0, 0.02));
        let (s, r) = noise_reduction_sigmas(1.0);
        assert_eq!(s, 3.0);
        assert!((r - 0.12).abs() < 1e-6);
    }
}

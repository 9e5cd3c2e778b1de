//! Dark-channel dehaze.
//!
//! Haze raises the darkest channel everywhere. The per-pixel minimum
//! channel, smoothed with a wide Gaussian, estimates how much veil a
//! region carries; the airlight is the mean colour of the haziest 0.1% of
//! pixels. Positive amounts invert the scattering model, negative amounts
//! blend toward the airlight.
//!
//! ```text
//! t   = max(1 - 0.95 * amount * dark / max(A), 0.1)
//! out = (in - A) / t + A
//! ```

use lux_core::{LinearImage, Rgb, WorkerPool, lerp};
use tracing::debug;

use crate::EPSILON;
use crate::blur::blur_plane;

/// Smoothing of the dark channel, in pixels.
pub const DARK_CHANNEL_SIGMA: f32 = 6.0;

/// Fraction of pixels used to estimate airlight.
pub const AIRLIGHT_FRACTION: f32 = 0.001;

/// Haze retained at full strength.
const OMEGA: f32 = 0.95;

/// Lower bound on transmission.
const MIN_TRANSMISSION: f32 = 0.1;

/// Veil opacity for `amount = -1`.
const MAX_VEIL: f32 = 0.5;

/// Per-pixel minimum channel.
pub fn dark_channel(image: &LinearImage) -> Vec<f32> {
    let (r, g, b) = image.planes();
    r.iter()
        .zip(g)
        .zip(b)
        .map(|((&r, &g), &b)| r.min(g).min(b).max(0.0))
        .collect()
}

/// Mean colour of the pixels with the highest dark channel.
pub fn estimate_airlight(image: &LinearImage, dark: &[f32]) -> Rgb {
    let n = dark.len();
    if n == 0 {
        return [1.0; 3];
    }
    let count = ((n as f32 * AIRLIGHT_FRACTION).ceil() as usize).clamp(1, n);
    let mut sorted = dark.to_vec();
    let idx = n - count;
    let (_, &mut threshold, _) = sorted.select_nth_unstable_by(idx, f32::total_cmp);

    let mut acc = [0.0f64; 3];
    let mut used = 0usize;
    for (i, &d) in dark.iter().enumerate() {
        if d >= threshold {
            let p = image.pixel_at(i);
            for c in 0..3 {
                acc[c] += p[c] as f64;
            }
            used += 1;
        }
    }
    let used = used.max(1) as f64;
    acc.map(|v| ((v / used) as f32).max(1e-3))
}

/// Removes (`amount > 0`) or adds (`amount < 0`) haze; `amount` in [-1, 1].
pub fn apply_dehaze(image: &mut LinearImage, amount: f32, pool: &WorkerPool) {
    if amount.abs() < EPSILON || image.is_empty() {
        return;
    }
    let amount = amount.clamp(-1.0, 1.0);
    let raw_dark = dark_channel(image);
    let airlight = estimate_airlight(image, &raw_dark);
    debug!(amount, ?airlight, "dehaze");

    if amount < 0.0 {
        let k = -amount * MAX_VEIL;
        pool.map_pixels(image, |[r, g, b]| {
            [
                lerp(r, airlight[0], k),
                lerp(g, airlight[1], k),
                lerp(b, airlight[2], k),
            ]
        });
        return;
    }

    let (w, h) = image.dimensions();
    let dark = blur_plane(&raw_dark, w as usize, h as usize, DARK_CHANNEL_SIGMA, pool);
    let a_max = airlight[0].max(airlight[1]).max(airlight[2]);
    pool.for_each_rows(image, |mut band| {
        let base = band.rows.start * band.width;
        for i in 0..band.len() {
            let t = (1.0 - OMEGA * amount * dark[base + i] / a_max).max(MIN_TRANSMISSION);
            let p = band.get(i);
            let mut out = [0.0; 3];
            for c in 0..3 {
                out[c] = ((p[c] - airlight[c]) / t + airlight[c]).max(0.0);
            }
            band.set(i, out);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hazy() -> LinearImage {
        // dark scene content under a grey veil
        LinearImage::from_fn(40, 40, |x, y| {
            let scene = if (x / 8 + y / 8) % 2 == 0 { 0.05 } else { 0.3 };
            let veil = 0.4;
            let s = scene * 0.6 + veil * 0.4;
            [s, s * 0.95, s * 0.9]
        })
    }

    fn spread(img: &LinearImage) -> f32 {
        let g = img.green();
        let max = g.iter().cloned().fold(f32::MIN, f32::max);
        let min = g.iter().cloned().fold(f32::MAX, f32::min);
        max - min
    }

    #[test]
    fn dehaze_increases_contrast() {
        let src = hazy();
        let mut img = src.clone();
        apply_dehaze(&mut img, 0.8, WorkerPool::global());
        assert!(spread(&img) > spread(&src));
    }

    #[test]
    fn negative_adds_veil() {
        let src = hazy();
        let mut img = src.clone();
        apply_dehaze(&mut img, -1.0, WorkerPool::global());
        assert!(spread(&img) < spread(&src));
    }

    #[test]
    fn airlight_is_brightest_dark_channel() {
        let img = LinearImage::from_fn(100, 20, |x, _| if x == 50 { [0.9, 0.8, 0.7] } else { [0.1, 0.2, 0.05] });
        let dark = dark_channel(&img);
        let a = estimate_airlight(&img, &dark);
        assert!((a[0] - 0.9).abs() < 1e-5);
    }

    #[test]
    fn zero_is_noop() {
        let src = hazy();
        let mut img = src.clone();
        apply_dehaze(&mut img, 0.0, WorkerPool::global());
        assert_eq!(img, src);
    }
}

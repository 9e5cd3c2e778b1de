//! Highlights / shadows / whites / blacks.
//!
//! Each slider owns a smoothstep window over CIE L*. The weighted sum of
//! the sliders becomes an L* offset, which is converted back to
//! luminance; RGB is then rescaled by the luminance ratio so hue and
//! saturation are kept.
//!
//! ```text
//! highlights  L* in [50, 90]   rising
//! shadows     L* in [10, 50]   falling
//! whites      L* in [60, 95]   rising
//! blacks      L* in [5, 40]    falling
//! ```

use lux_core::{LinearImage, WorkerPool, luminance_rec709, rescale_luminance, smoothstep};
use lux_transfer::lstar;
use serde::{Deserialize, Serialize};

use crate::EPSILON;

/// L* offset produced by a slider at +/-1 with full window weight.
pub const MAX_LSTAR_SHIFT: f32 = 25.0;

/// Slider values, each in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneRegions {
    /// Brightens (+) or recovers (-) upper mid-tones
    pub highlights: f32,
    /// Lifts (+) or deepens (-) lower mid-tones
    pub shadows: f32,
    /// Moves the brightest tones
    pub whites: f32,
    /// Moves the darkest tones
    pub blacks: f32,
}

/// Window weights `[highlight, shadow, white, black]` at lightness `l`.
///
/// Every weight is in [0, 1].
#[inline]
pub fn window_weights(l: f32) -> [f32; 4] {
    [
        smoothstep(50.0, 90.0, l),
        1.0 - smoothstep(10.0, 50.0, l),
        smoothstep(60.0, 95.0, l),
        1.0 - smoothstep(5.0, 40.0, l),
    ]
}

impl ToneRegions {
    /// `true` when every slider is within epsilon of zero.
    pub fn is_identity(&self) -> bool {
        self.sliders().iter().all(|v| v.abs() < EPSILON)
    }

    fn sliders(&self) -> [f32; 4] {
        [self.highlights, self.shadows, self.whites, self.blacks]
    }

    /// L* offset for a pixel of lightness `l`.
    #[inline]
    pub fn lstar_delta(&self, l: f32) -> f32 {
        let w = window_weights(l);
        let s = self.sliders();
        let sum: f32 = (0..4).map(|i| s[i].clamp(-1.0, 1.0) * w[i]).sum();
        sum * MAX_LSTAR_SHIFT
    }

    /// Adjusts one pixel.
    #[inline]
    pub fn apply_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        let y = luminance_rec709(rgb);
        let l = lstar::from_luminance(y);
        let delta = self.lstar_delta(l);
        if delta.abs() < 1e-6 {
            return rgb;
        }
        let target = lstar::to_luminance((l + delta).max(0.0));
        rescale_luminance(rgb, y, target)
    }
}

/// Applies tone-region sliders to every pixel.
pub fn apply_tone_regions(image: &mut LinearImage, regions: &ToneRegions, pool: &WorkerPool) {
    if regions.is_identity() {
        return;
    }
    pool.map_pixels(image, |rgb| regions.apply_rgb(rgb));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_bounded_and_monotonic() {
        let mut prev = window_weights(0.0);
        for i in 1..=120 {
            let w = window_weights(i as f32);
            for k in 0..4 {
                assert!((0.0..=1.0).contains(&w[k]));
            }
            // rising windows never fall, falling windows never rise
            assert!(w[0] >= prev[0] && w[2] >= prev[2]);
            assert!(w[1] <= prev[1] && w[3] <= prev[3]);
            prev = w;
        }
    }

    #[test]
    fn all_zero_is_bit_identical() {
        let src = LinearImage::from_fn(7, 3, |x, y| [x as f32 * 0.13, y as f32 * 0.4, 0.02]);
        let mut img = src.clone();
        apply_tone_regions(&mut img, &ToneRegions::default(), WorkerPool::global());
        assert_eq!(img, src);
    }

    #[test]
    fn shadows_lift_darks_not_brights() {
        let regions = ToneRegions {
            shadows: 1.0,
            ..Default::default()
        };
        let dark = regions.apply_rgb([0.02; 3]);
        let bright = regions.apply_rgb([0.9; 3]);
        assert!(dark[0] > 0.02);
        assert_abs_diff_eq!(bright[0], 0.9, epsilon = 1e-6);
    }

    #[test]
    fn highlights_negative_recovers() {
        let regions = ToneRegions {
            highlights: -1.0,
            ..Default::default()
        };
        let out = regions.apply_rgb([0.6, 0.5, 0.4]);
        assert!(luminance_rec709(out) < luminance_rec709([0.6, 0.5, 0.4]));
        // chromaticity kept
        assert_abs_diff_eq!(out[0] / out[2], 1.5, epsilon = 1e-4);
    }
}

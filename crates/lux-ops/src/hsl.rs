//! Per-hue-segment HSL adjustments.
//!
//! The hue circle is split into 8 segments centred every 45 degrees,
//! starting at red. A pixel's hue falls between two segment centres and
//! takes a linear mix of their adjustments, so neighbouring segments
//! blend without seams.
//!
//! | Index | Centre | Range name |
//! |-------|--------|------------|
//! | 0 | 0   | Reds     |
//! | 1 | 45  | Oranges  |
//! | 2 | 90  | Yellows  |
//! | 3 | 135 | Greens   |
//! | 4 | 180 | Aquas    |
//! | 5 | 225 | Blues    |
//! | 6 | 270 | Purples  |
//! | 7 | 315 | Magentas |
//!
//! Scene-linear values above 1 are normalized by the pixel's maximum
//! before the HSL round trip and scaled back afterwards.

use lux_core::{LinearImage, Rgb, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::EPSILON;

/// Number of hue segments.
pub const SEGMENTS: usize = 8;

/// Width of one segment in degrees.
pub const SEGMENT_WIDTH: f32 = 360.0 / SEGMENTS as f32;

/// Hue rotation at full slider deflection, in degrees.
pub const MAX_HUE_SHIFT: f32 = 30.0;

/// Per-segment adjustments, each value in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HslParams {
    /// Hue rotation per segment
    pub hue: [f32; SEGMENTS],
    /// Saturation change per segment
    pub saturation: [f32; SEGMENTS],
    /// Lightness change per segment, in stops
    pub luminance: [f32; SEGMENTS],
}

impl HslParams {
    /// `true` when every entry is within epsilon of zero.
    pub fn is_identity(&self) -> bool {
        self.hue
            .iter()
            .chain(&self.saturation)
            .chain(&self.luminance)
            .all(|v| v.abs() < EPSILON)
    }

    /// Interpolated `(hue, saturation, luminance)` deltas at `hue` degrees.
    ///
    /// Not a hard bucket lookup: a hue between two segment centres takes
    /// a linear mix of both segments, and only a hue exactly on a centre
    /// gets that segment's values alone. Sliders are clamped to [-1, 1].
    pub fn deltas_at(&self, hue: f32) -> (f32, f32, f32) {
        let pos = hue.rem_euclid(360.0) / SEGMENT_WIDTH;
        let i = (pos.floor() as usize) % SEGMENTS;
        let j = (i + 1) % SEGMENTS;
        let t = pos - pos.floor();
        let mix = |a: &[f32; SEGMENTS]| a[i].clamp(-1.0, 1.0) * (1.0 - t) + a[j].clamp(-1.0, 1.0) * t;
        (mix(&self.hue), mix(&self.saturation), mix(&self.luminance))
    }

    /// Adjusts one pixel.
    pub fn apply_rgb(&self, rgb: Rgb) -> Rgb {
        let scale = rgb[0].max(rgb[1]).max(rgb[2]).max(1.0);
        let norm = [rgb[0] / scale, rgb[1] / scale, rgb[2] / scale];
        let mut hsl = rgb_to_hsl(norm);
        if hsl.s <= 1e-6 {
            return rgb;
        }
        let (dh, ds, dl) = self.deltas_at(hsl.h);
        hsl.h = (hsl.h + dh * MAX_HUE_SHIFT).rem_euclid(360.0);
        // lightness change fades out toward grey
        hsl.l = (hsl.l * (dl * hsl.s).exp2()).clamp(0.0, 1.0);
        hsl.s = (hsl.s * (1.0 + ds)).clamp(0.0, 1.0);
        let out = hsl_to_rgb(hsl);
        [out[0] * scale, out[1] * scale, out[2] * scale]
    }
}

/// HSL triple: hue in degrees [0, 360), saturation and lightness in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees
    pub h: f32,
    /// Saturation
    pub s: f32,
    /// Lightness
    pub l: f32,
}

/// RGB in [0, 1] to HSL.
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let [r, g, b] = rgb.map(|c| c.clamp(0.0, 1.0));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;
    if delta < 1e-6 {
        return Hsl { h: 0.0, s: 0.0, l };
    }
    let s = if l < 0.5 { delta / (max + min) } else { delta / (2.0 - max - min) };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    Hsl {
        h: (h * 60.0).rem_euclid(360.0),
        s,
        l,
    }
}

/// HSL to RGB in [0, 1].
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);
    if s < 1e-6 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = hsl.h.rem_euclid(360.0) / 360.0;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

#[inline]
fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Applies per-segment HSL adjustments.
pub fn apply_hsl(image: &mut LinearImage, params: &HslParams, pool: &WorkerPool) {
    if params.is_identity() {
        return;
    }
    pool.map_pixels(image, |rgb| params.apply_rgb(rgb));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hsl_round_trip() {
        for rgb in [[0.8, 0.2, 0.1], [0.1, 0.6, 0.3], [0.25, 0.25, 0.9], [0.5, 0.5, 0.5]] {
            let back = hsl_to_rgb(rgb_to_hsl(rgb));
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], rgb[c], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn primary_hues() {
        assert_abs_diff_eq!(rgb_to_hsl([1.0, 0.0, 0.0]).h, 0.0);
        assert_abs_diff_eq!(rgb_to_hsl([0.0, 1.0, 0.0]).h, 120.0, epsilon = 1e-4);
        assert_abs_diff_eq!(rgb_to_hsl([0.0, 0.0, 1.0]).h, 240.0, epsilon = 1e-4);
        assert_abs_diff_eq!(rgb_to_hsl([1.0, 0.0, 1.0]).h, 300.0, epsilon = 1e-4);
    }

    #[test]
    fn all_zero_is_bit_identical() {
        let src = LinearImage::from_fn(6, 6, |x, y| [x as f32 * 0.3, y as f32 * 0.1, 0.7]);
        let mut img = src.clone();
        apply_hsl(&mut img, &HslParams::default(), WorkerPool::global());
        assert_eq!(img, src);
    }

    #[test]
    fn deltas_interpolate_between_centres() {
        let mut p = HslParams::default();
        p.saturation[0] = 1.0;
        assert_abs_diff_eq!(p.deltas_at(0.0).1, 1.0);
        assert_abs_diff_eq!(p.deltas_at(22.5).1, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(p.deltas_at(45.0).1, 0.0, epsilon = 1e-6);
        // wraps from magentas back to reds
        assert_abs_diff_eq!(p.deltas_at(337.5).1, 0.5, epsilon = 1e-6);
        p.hue[2] = 3.0;
        assert_abs_diff_eq!(p.deltas_at(90.0).0, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.deltas_at(67.5).0, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn blue_desaturation_leaves_red() {
        let mut p = HslParams::default();
        p.saturation[5] = -1.0;
        // hue 225, the blues centre
        let blue = p.apply_rgb([0.1, 0.175, 0.4]);
        assert!(blue[2] - blue[0] < 1e-4);
        assert!(blue[1] - blue[0] < 1e-4);
        let red = p.apply_rgb([0.4, 0.1, 0.1]);
        assert_abs_diff_eq!(red[0], 0.4, epsilon = 1e-5);
    }

    #[test]
    fn highlights_above_one_keep_scale() {
        let mut p = HslParams::default();
        p.hue[0] = 0.5;
        let out = p.apply_rgb([4.0, 1.0, 1.0]);
        assert!(out.iter().cloned().fold(0.0, f32::max) > 3.9);
    }
}

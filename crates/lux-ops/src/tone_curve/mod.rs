//! Point curves: a master RGB curve plus per-channel R, G and B.
//!
//! Each enabled curve is baked into a 256-entry lookup table from its
//! Hermite spline, and looked up with linear interpolation.
//!
//! # Application order
//!
//! 1. The master curve maps Rec.709 luminance; RGB is rescaled by the
//!    luminance ratio so hue is kept.
//! 2. R, G and B curves map their channel directly.
//!
//! Values above 1 continue with slope one from the curve's end point
//! (`out = x - 1 + lut(1)`), so highlight detail is not flattened.
//!
//! # Example
//!
//! ```rust
//! use lux_ops::tone_curve::{ToneCurveLut, ToneCurveParams};
//!
//! let lut = ToneCurveLut::from_points(&[(0.0, 0.0), (0.5, 0.6), (1.0, 1.0)]);
//! assert!(lut.lookup(0.5) > 0.59);
//!
//! let params = ToneCurveParams::default();
//! assert!(params.is_identity());
//! ```

pub mod spline;

use lux_core::{LinearImage, WorkerPool, luminance_rec709, rescale_luminance};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use spline::{CurvePoint, HermiteSpline, IDENTITY, sanitize};

/// Lookup table resolution.
pub const LUT_SIZE: usize = 256;

/// Largest deviation from the diagonal still treated as identity.
const IDENTITY_TOLERANCE: f32 = 1e-5;

/// Control points for each curve. Empty means disabled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneCurveParams {
    /// Master curve on luminance
    pub rgb: Vec<CurvePoint>,
    /// Red channel curve
    pub red: Vec<CurvePoint>,
    /// Green channel curve
    pub green: Vec<CurvePoint>,
    /// Blue channel curve
    pub blue: Vec<CurvePoint>,
}

impl ToneCurveParams {
    /// `true` when no curve would change any value.
    pub fn is_identity(&self) -> bool {
        self.compile().is_identity()
    }

    /// Builds lookup tables for the non-identity curves.
    pub fn compile(&self) -> ToneCurves {
        ToneCurves {
            master: ToneCurveLut::enabled(&self.rgb),
            channels: [
                ToneCurveLut::enabled(&self.red),
                ToneCurveLut::enabled(&self.green),
                ToneCurveLut::enabled(&self.blue),
            ],
        }
    }
}

/// Baked curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneCurveLut {
    table: Vec<f32>,
}

impl ToneCurveLut {
    /// Bakes control points into a table.
    pub fn from_points(points: &[CurvePoint]) -> Self {
        let spline = HermiteSpline::new(points);
        let last = (LUT_SIZE - 1) as f32;
        let table = (0..LUT_SIZE)
            .map(|i| spline.evaluate(i as f32 / last).clamp(0.0, 1.0))
            .collect();
        Self { table }
    }

    fn enabled(points: &[CurvePoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let lut = Self::from_points(points);
        (!lut.is_identity()).then_some(lut)
    }

    /// `true` if the table is the diagonal.
    pub fn is_identity(&self) -> bool {
        let last = (LUT_SIZE - 1) as f32;
        self.table
            .iter()
            .enumerate()
            .all(|(i, &v)| (v - i as f32 / last).abs() < IDENTITY_TOLERANCE)
    }

    /// Raw table values.
    pub fn table(&self) -> &[f32] {
        &self.table
    }

    /// Maps `x` through the curve.
    #[inline]
    pub fn lookup(&self, x: f32) -> f32 {
        let last = LUT_SIZE - 1;
        if x >= 1.0 {
            return x - 1.0 + self.table[last];
        }
        if x <= 0.0 {
            return x + self.table[0];
        }
        let pos = x * last as f32;
        let i = (pos as usize).min(last - 1);
        let t = pos - i as f32;
        self.table[i] + (self.table[i + 1] - self.table[i]) * t
    }
}

/// Compiled set of curves ready to apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToneCurves {
    /// Master luminance curve
    pub master: Option<ToneCurveLut>,
    /// R, G, B curves
    pub channels: [Option<ToneCurveLut>; 3],
}

impl ToneCurves {
    /// `true` when every curve is disabled.
    pub fn is_identity(&self) -> bool {
        self.master.is_none() && self.channels.iter().all(Option::is_none)
    }

    /// Maps one pixel.
    #[inline]
    pub fn apply_rgb(&self, mut rgb: [f32; 3]) -> [f32; 3] {
        if let Some(master) = &self.master {
            let y = luminance_rec709(rgb);
            if y > 0.0 {
                rgb = rescale_luminance(rgb, y, master.lookup(y).max(0.0));
            }
        }
        for (c, lut) in self.channels.iter().enumerate() {
            if let Some(lut) = lut {
                rgb[c] = lut.lookup(rgb[c]).max(0.0);
            }
        }
        rgb
    }
}

/// Applies all enabled curves.
pub fn apply_tone_curves(image: &mut LinearImage, params: &ToneCurveParams, pool: &WorkerPool) {
    let curves = params.compile();
    if curves.is_identity() {
        return;
    }
    trace!(
        master = curves.master.is_some(),
        channels = curves.channels.iter().filter(|c| c.is_some()).count(),
        "tone curves"
    );
    pool.map_pixels(image, |rgb| curves.apply_rgb(rgb));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_points_disable_curve() {
        let params = ToneCurveParams {
            rgb: IDENTITY.to_vec(),
            red: vec![(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)],
            ..Default::default()
        };
        assert!(params.is_identity());
        let src = LinearImage::from_fn(4, 4, |x, y| [x as f32 * 0.3, y as f32 * 0.2, 1.7]);
        let mut img = src.clone();
        apply_tone_curves(&mut img, &params, WorkerPool::global());
        assert_eq!(img, src);
    }

    #[test]
    fn lookup_interpolates_and_extends() {
        let lut = ToneCurveLut::from_points(&[(0.0, 0.1), (1.0, 0.9)]);
        assert_abs_diff_eq!(lut.lookup(0.0), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(lut.lookup(0.5), 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(lut.lookup(1.0), 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(lut.lookup(2.5), 2.4, epsilon = 1e-5);
    }

    #[test]
    fn lut_hits_control_points() {
        let lut = ToneCurveLut::from_points(&[(0.0, 0.0), (0.4, 0.6), (1.0, 1.0)]);
        assert_abs_diff_eq!(lut.lookup(0.4), 0.6, epsilon = 2e-3);
        assert_eq!(lut.table().len(), LUT_SIZE);
    }

    #[test]
    fn master_curve_keeps_hue() {
        let params = ToneCurveParams {
            rgb: vec![(0.0, 0.0), (0.5, 0.7), (1.0, 1.0)],
            ..Default::default()
        };
        let curves = params.compile();
        let out = curves.apply_rgb([0.4, 0.2, 0.1]);
        assert_abs_diff_eq!(out[0] / out[1], 2.0, epsilon = 1e-4);
        assert!(luminance_rec709(out) > luminance_rec709([0.4, 0.2, 0.1]));
    }

    #[test]
    fn channel_curve_only_touches_its_channel() {
        let params = ToneCurveParams {
            blue: vec![(0.0, 0.0), (0.5, 0.3), (1.0, 1.0)],
            ..Default::default()
        };
        let out = params.compile().apply_rgb([0.5, 0.5, 0.5]);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], 0.5);
        assert_abs_diff_eq!(out[2], 0.3, epsilon = 2e-3);
    }
}

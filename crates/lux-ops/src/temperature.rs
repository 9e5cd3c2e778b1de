//! White balance shift along the Planckian locus.
//!
//! The temperature slider moves the target illuminant away from a 6500 K
//! base; tint moves it off the locus along the green/magenta axis. Both
//! illuminants are converted to linear sRGB, normalized to unit
//! luminance, and their ratio becomes a per-channel gain. The gain is
//! applied and the pixel is rescaled back to its original luminance, so
//! white balance never changes brightness.
//!
//! ```text
//! kelvin  = 6500 - 3500 * temperature       (+1 -> 3000 K, warmer)
//! x(K)    = CIE daylight polynomial, branches split at 7000 K
//! y(x)    = -3x^2 + 2.87x - 0.275 - 0.05 * tint
//! gain    = clamp(rgb(target) / rgb(base), 0.5, 2.0)
//! ```

use glam::{Mat3, Vec3};
use lux_core::{LinearImage, WorkerPool, Rgb, luminance_rec709, rescale_luminance};
use tracing::trace;

/// Neutral illuminant.
pub const BASE_KELVIN: f32 = 6500.0;

/// Kelvin offset at full slider deflection.
pub const KELVIN_RANGE: f32 = 3500.0;

/// Chromaticity y offset at full tint.
pub const TINT_SCALE: f32 = 0.05;

/// Smallest slider magnitude that does anything.
pub const MIN_SHIFT: f32 = 0.01;

/// Gain clamp.
pub const GAIN_RANGE: (f32, f32) = (0.5, 2.0);

/// XYZ (D65) to linear sRGB, column-major.
const XYZ_TO_SRGB: Mat3 = Mat3::from_cols_array(&[
    3.240_454_2, -0.969_266, 0.055_643_4, //
    -1.537_138_5, 1.876_010_8, -0.204_025_9, //
    -0.498_531_4, 0.041_556, 1.057_225_2,
]);

/// Maps a slider in [-1, 1] to a target temperature in Kelvin.
#[inline]
pub fn slider_to_kelvin(temperature: f32) -> f32 {
    BASE_KELVIN - KELVIN_RANGE * temperature.clamp(-1.0, 1.0)
}

/// Chromaticity x of the illuminant at `kelvin`.
pub fn kelvin_to_x(kelvin: f32) -> f32 {
    let k = kelvin.clamp(2000.0, 25000.0);
    let k2 = k * k;
    let k3 = k2 * k;
    if k <= 7000.0 {
        -4.6070e9 / k3 + 2.9678e6 / k2 + 0.09911e3 / k + 0.244063
    } else {
        -2.0064e9 / k3 + 1.9018e6 / k2 + 0.24748e3 / k + 0.237040
    }
}

/// Chromaticity `(x, y)` at `kelvin`, with `tint` pushing y off the locus.
pub fn illuminant_xy(kelvin: f32, tint: f32) -> (f32, f32) {
    let x = kelvin_to_x(kelvin);
    let y = -3.0 * x * x + 2.87 * x - 0.275 - TINT_SCALE * tint.clamp(-1.0, 1.0);
    (x, y)
}

/// Linear sRGB of an illuminant, normalized to unit luminance.
pub fn illuminant_rgb(x: f32, y: f32) -> Rgb {
    let y = y.max(1e-4);
    let xyz = Vec3::new(x / y, 1.0, (1.0 - x - y) / y);
    let rgb = (XYZ_TO_SRGB * xyz).max(Vec3::splat(1e-4));
    let rgb = [rgb.x, rgb.y, rgb.z];
    let lum = luminance_rec709(rgb);
    [rgb[0] / lum, rgb[1] / lum, rgb[2] / lum]
}

/// Per-channel gains for a temperature/tint slider pair.
///
/// Returns `None` when both sliders are below [`MIN_SHIFT`].
pub fn white_balance_gains(temperature: f32, tint: f32) -> Option<Rgb> {
    if temperature.abs() < MIN_SHIFT && tint.abs() < MIN_SHIFT {
        return None;
    }
    let (bx, by) = illuminant_xy(BASE_KELVIN, 0.0);
    let (tx, ty) = illuminant_xy(slider_to_kelvin(temperature), tint);
    let base = illuminant_rgb(bx, by);
    let target = illuminant_rgb(tx, ty);
    let (lo, hi) = GAIN_RANGE;
    Some([
        (target[0] / base[0]).clamp(lo, hi),
        (target[1] / base[1]).clamp(lo, hi),
        (target[2] / base[2]).clamp(lo, hi),
    ])
}

/// Applies gains and restores the original luminance.
#[inline]
pub fn apply_gains(rgb: Rgb, gains: Rgb) -> Rgb {
    let y = luminance_rec709(rgb);
    if y <= 0.0 {
        return rgb;
    }
    let shifted = [rgb[0] * gains[0], rgb[1] * gains[1], rgb[2] * gains[2]];
    rescale_luminance(shifted, luminance_rec709(shifted), y)
}

/// Shifts white balance of the whole image.
pub fn apply_temperature(image: &mut LinearImage, temperature: f32, tint: f32, pool: &WorkerPool) {
    let Some(gains) = white_balance_gains(temperature, tint) else {
        return;
    };
    trace!(temperature, tint, ?gains, "white balance");
    pool.map_pixels(image, |rgb| apply_gains(rgb, gains));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn neutral_sliders_return_early() {
        assert!(white_balance_gains(0.0, 0.0).is_none());
        assert!(white_balance_gains(0.005, -0.009).is_none());
        let src = LinearImage::from_fn(4, 4, |x, y| [x as f32 * 0.2, 0.3, y as f32 * 0.1]);
        let mut img = src.clone();
        apply_temperature(&mut img, 0.0, 0.0, WorkerPool::global());
        assert_eq!(img, src);
    }

    #[test]
    fn base_illuminant_is_near_white() {
        let (x, y) = illuminant_xy(BASE_KELVIN, 0.0);
        let rgb = illuminant_rgb(x, y);
        for c in rgb {
            assert!((c - 1.0).abs() < 0.1, "{:?}", rgb);
        }
    }

    #[test]
    fn warm_raises_red_lowers_blue() {
        let g = white_balance_gains(1.0, 0.0).unwrap();
        assert!(g[0] > 1.0);
        assert!(g[2] < 1.0);
        let cool = white_balance_gains(-1.0, 0.0).unwrap();
        assert!(cool[0] < 1.0);
        assert!(cool[2] > 1.0);
    }

    #[test]
    fn magenta_tint_lowers_green() {
        let g = white_balance_gains(0.0, 1.0).unwrap();
        assert!(g[1] < g[0]);
        assert!(g[1] < g[2]);
    }

    #[test]
    fn gains_are_clamped() {
        for t in [-1.0, -0.5, 0.5, 1.0] {
            for tint in [-1.0, 0.0, 1.0] {
                let g = white_balance_gains(t, tint).unwrap();
                for c in g {
                    assert!((0.5..=2.0).contains(&c));
                }
            }
        }
    }

    #[test]
    fn luminance_is_preserved() {
        let g = white_balance_gains(0.7, -0.3).unwrap();
        let rgb = [0.3, 0.45, 0.2];
        let out = apply_gains(rgb, g);
        assert_abs_diff_eq!(luminance_rec709(out), luminance_rec709(rgb), epsilon = 1e-5);
    }

    #[test]
    fn locus_branches_meet() {
        let below = kelvin_to_x(6999.0);
        let above = kelvin_to_x(7001.0);
        assert!((below - above).abs() < 1e-3);
    }
}

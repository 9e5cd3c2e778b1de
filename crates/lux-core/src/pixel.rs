//! Pixel-level helpers shared by every kernel.
//!
//! All "perceptual brightness" computations in lux use the Rec.709
//! luminance weights. There is exactly one definition, here.

/// Rec.709 luminance coefficient for red channel.
pub const REC709_LUMA_R: f32 = 0.2126;

/// Rec.709 luminance coefficient for green channel.
pub const REC709_LUMA_G: f32 = 0.7152;

/// Rec.709 luminance coefficient for blue channel.
pub const REC709_LUMA_B: f32 = 0.0722;

/// Rec.709 luminance coefficients as an array [R, G, B].
///
/// # Example
/// ```
/// use lux_core::pixel::REC709_LUMA;
/// let rgb = [0.5, 0.3, 0.2];
/// let luma = rgb[0] * REC709_LUMA[0] + rgb[1] * REC709_LUMA[1] + rgb[2] * REC709_LUMA[2];
/// assert!(luma > 0.3);
/// ```
pub const REC709_LUMA: [f32; 3] = [REC709_LUMA_R, REC709_LUMA_G, REC709_LUMA_B];

/// An RGB triple in scene-linear light.
pub type Rgb = [f32; 3];

/// Calculate Rec.709 luminance from RGB values.
///
/// `Y = 0.2126*R + 0.7152*G + 0.0722*B`
///
/// # Example
/// ```
/// use lux_core::luminance_rec709;
/// let y = luminance_rec709([1.0, 1.0, 1.0]);
/// assert!((y - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn luminance_rec709(rgb: Rgb) -> f32 {
    rgb[0] * REC709_LUMA_R + rgb[1] * REC709_LUMA_G + rgb[2] * REC709_LUMA_B
}

/// Rescales `rgb` so its luminance becomes `target`, keeping chromaticity.
///
/// Pixels with (near) zero luminance are lifted to a neutral grey of the
/// target luminance, since there is no hue to preserve.
#[inline]
pub fn rescale_luminance(rgb: Rgb, current: f32, target: f32) -> Rgb {
    if current > 1e-6 {
        let k = target / current;
        [rgb[0] * k, rgb[1] * k, rgb[2] * k]
    } else {
        let t = target.max(0.0);
        [t, t, t]
    }
}

/// Cubic Hermite step: 0 below `edge0`, 1 above `edge1`, smooth between.
///
/// Monotonic and bounded in [0, 1] for `edge0 < edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn luma_weights_sum_to_one() {
        assert_abs_diff_eq!(REC709_LUMA.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn smoothstep_bounds_and_monotonic() {
        let mut prev = 0.0;
        for i in 0..=200 {
            let x = -0.5 + i as f32 * 0.01;
            let v = smoothstep(0.2, 0.8, x);
            assert!((0.0..=1.0).contains(&v));
            assert!(v >= prev);
            prev = v;
        }
        assert_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
        assert_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
        assert_abs_diff_eq!(smoothstep(0.2, 0.8, 0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn rescale_keeps_ratios() {
        let rgb = [0.4, 0.2, 0.1];
        let y = luminance_rec709(rgb);
        let out = rescale_luminance(rgb, y, y * 2.0);
        assert_abs_diff_eq!(out[0] / out[1], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(luminance_rec709(out), y * 2.0, epsilon = 1e-5);
    }

    #[test]
    fn rescale_black_becomes_grey() {
        let out = rescale_luminance([0.0; 3], 0.0, 0.25);
        assert_eq!(out, [0.25; 3]);
    }
}

//! Saturation and vibrance.
//!
//! Both scale each channel's distance from the pixel's Rec.709
//! luminance, so brightness is untouched. Vibrance weights the scale by
//! how unsaturated the pixel already is and damps skin-like colours.

use lux_core::{LinearImage, Rgb, WorkerPool, luminance_rec709};

use crate::EPSILON;

/// Vibrance multiplier on skin-like pixels.
pub const SKIN_DAMPING: f32 = 0.4;

/// Accepted R/G ratio for skin detection.
pub const SKIN_RG_RANGE: (f32, f32) = (1.1, 2.0);

/// Accepted G/B ratio for skin detection.
pub const SKIN_GB_RANGE: (f32, f32) = (1.05, 2.4);

/// Scales chroma around luminance by `factor`.
#[inline]
pub fn scale_chroma(rgb: Rgb, factor: f32) -> Rgb {
    let y = luminance_rec709(rgb);
    [
        (y + (rgb[0] - y) * factor).max(0.0),
        (y + (rgb[1] - y) * factor).max(0.0),
        (y + (rgb[2] - y) * factor).max(0.0),
    ]
}

/// HSV-style saturation in [0, 1].
#[inline]
pub fn chroma_ratio(rgb: Rgb) -> f32 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    if max <= 1e-6 {
        return 0.0;
    }
    let min = rgb[0].min(rgb[1]).min(rgb[2]).max(0.0);
    ((max - min) / max).clamp(0.0, 1.0)
}

/// `true` for warm, ordered R > G > B pixels in the skin ratio band.
#[inline]
pub fn is_skin_tone(rgb: Rgb) -> bool {
    let [r, g, b] = rgb;
    if !(r > g && g > b && b > 0.0) {
        return false;
    }
    let rg = r / g;
    let gb = g / b;
    (SKIN_RG_RANGE.0..=SKIN_RG_RANGE.1).contains(&rg) && (SKIN_GB_RANGE.0..=SKIN_GB_RANGE.1).contains(&gb)
}

/// Global saturation; `amount` in [-1, 1], -1 is monochrome.
pub fn apply_saturation(image: &mut LinearImage, amount: f32, pool: &WorkerPool) {
    if amount.abs() < EPSILON {
        return;
    }
    let factor = 1.0 + amount.clamp(-1.0, 1.0);
    pool.map_pixels(image, |rgb| scale_chroma(rgb, factor));
}

/// Vibrance for one pixel.
#[inline]
pub fn vibrance_rgb(rgb: Rgb, amount: f32) -> Rgb {
    let sat = chroma_ratio(rgb);
    // boosts favour muted pixels, cuts favour saturated ones
    let mut strength = if amount >= 0.0 { amount * (1.0 - sat) } else { amount * sat };
    if is_skin_tone(rgb) {
        strength *= SKIN_DAMPING;
    }
    scale_chroma(rgb, 1.0 + strength)
}

/// Saturation that spares already-saturated and skin-tone pixels.
pub fn apply_vibrance(image: &mut LinearImage, amount: f32, pool: &WorkerPool) {
    if amount.abs() < EPSILON {
        return;
    }
    let amount = amount.clamp(-1.0, 1.0);
    pool.map_pixels(image, |rgb| vibrance_rgb(rgb, amount));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> LinearImage {
        LinearImage::from_fn(8, 8, |x, y| [x as f32 * 0.1, y as f32 * 0.05, 0.2])
    }

    #[test]
    fn zero_amounts_are_bit_identical() {
        let src = sample();
        let mut img = src.clone();
        apply_saturation(&mut img, 0.0, WorkerPool::global());
        apply_vibrance(&mut img, 0.0, WorkerPool::global());
        assert_eq!(img, src);
    }

    #[test]
    fn minus_one_is_grey() {
        let mut img = LinearImage::filled(2, 2, [0.6, 0.3, 0.1]);
        apply_saturation(&mut img, -1.0, &WorkerPool::sequential());
        let p = img.pixel(0, 0);
        let y = luminance_rec709([0.6, 0.3, 0.1]);
        for c in p {
            assert_abs_diff_eq!(c, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn saturation_keeps_luminance() {
        let rgb = [0.5, 0.25, 0.1];
        let out = scale_chroma(rgb, 1.4);
        assert_abs_diff_eq!(luminance_rec709(out), luminance_rec709(rgb), epsilon = 1e-6);
    }

    #[test]
    fn vibrance_favours_muted_pixels() {
        let muted = [0.4, 0.35, 0.3];
        let vivid = [0.6, 0.05, 0.3];
        let dm = chroma_ratio(vibrance_rgb(muted, 0.8)) - chroma_ratio(muted);
        let dv = chroma_ratio(vibrance_rgb(vivid, 0.8)) - chroma_ratio(vivid);
        assert!(dm > 0.0);
        assert!(dm > dv);
    }

    #[test]
    fn skin_is_damped() {
        let skin = [0.6, 0.4, 0.3];
        assert!(is_skin_tone(skin));
        assert!(!is_skin_tone([0.3, 0.4, 0.6]));
        let full = scale_chroma(skin, 1.0 + 0.8 * (1.0 - chroma_ratio(skin)));
        let damped = vibrance_rgb(skin, 0.8);
        assert!(chroma_ratio(damped) < chroma_ratio(full));
    }
}

//! CIE 1976 lightness (L*).
//!
//! Maps relative luminance Y (white = 1.0) to a perceptually uniform
//! 0-100 scale. Scene-linear values above 1.0 map above 100.
//!
//! ```text
//! L* = 116 * f(Y) - 16
//! f(t) = t^(1/3)                  if t > (6/29)^3
//!        t / (3 * (6/29)^2) + 4/29  otherwise
//! ```

/// (6/29)^3
const EPSILON: f32 = 216.0 / 24389.0;

/// (29/3)^3
const KAPPA: f32 = 24389.0 / 27.0;

/// Luminance to L*.
///
/// Negative luminance is treated as 0.
#[inline]
pub fn from_luminance(y: f32) -> f32 {
    let y = y.max(0.0);
    if y > EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        KAPPA * y
    }
}

/// L* to luminance.
#[inline]
pub fn to_luminance(l: f32) -> f32 {
    if l > KAPPA * EPSILON {
        let f = (l + 16.0) / 116.0;
        f * f * f
    } else {
        (l / KAPPA).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn anchors() {
        assert_abs_diff_eq!(from_luminance(0.0), 0.0);
        assert_abs_diff_eq!(from_luminance(1.0), 100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(from_luminance(0.18), 49.496, epsilon = 1e-2);
    }

    #[test]
    fn roundtrip() {
        for i in 0..=400 {
            let y = i as f32 / 200.0;
            assert_abs_diff_eq!(to_luminance(from_luminance(y)), y, epsilon = 1e-5);
        }
    }

    #[test]
    fn monotonic_across_toe() {
        let mut prev = -1.0;
        for i in 0..1000 {
            let l = from_luminance(i as f32 * 1e-4);
            assert!(l > prev);
            prev = l;
        }
    }
}

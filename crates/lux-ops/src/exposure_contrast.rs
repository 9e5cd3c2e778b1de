//! Exposure and contrast in scene-linear light.
//!
//! Exposure is a plain gain of `2^EV`. Contrast is a power curve around
//! the 0.18 mid-grey pivot, which is a straight line with slope `contrast`
//! in log2 space:
//!
//! ```text
//! exposure:  out = in * 2^ev
//! contrast:  out = pivot * (in / pivot)^contrast
//! ```
//!
//! `contrast = 1.0` is the identity and the pivot always maps to itself.

use lux_core::{LinearImage, WorkerPool};
use tracing::trace;

use crate::EPSILON;

/// Mid-grey pivot for contrast.
pub const PIVOT: f32 = 0.18;

/// Exposure range in stops.
pub const MAX_EV: f32 = 10.0;

/// Lowest accepted contrast exponent.
pub const MIN_CONTRAST: f32 = 0.1;

/// Highest accepted contrast exponent.
pub const MAX_CONTRAST: f32 = 4.0;

/// Linear gain for an exposure offset in stops.
#[inline]
pub fn exposure_gain(ev: f32) -> f32 {
    ev.clamp(-MAX_EV, MAX_EV).exp2()
}

/// Contrast curve for one channel value.
///
/// Non-positive inputs pass through.
#[inline]
pub fn contrast_value(x: f32, contrast: f32) -> f32 {
    if x <= 0.0 {
        x
    } else {
        PIVOT * (x / PIVOT).powf(contrast)
    }
}

/// Multiplies every channel by `2^ev`.
pub fn apply_exposure(image: &mut LinearImage, ev: f32, pool: &WorkerPool) {
    if ev.abs() < EPSILON {
        return;
    }
    let gain = exposure_gain(ev);
    trace!(ev, gain, "exposure");
    pool.map_pixels(image, |[r, g, b]| [r * gain, g * gain, b * gain]);
}

/// Applies the pivoted power curve per channel.
pub fn apply_contrast(image: &mut LinearImage, contrast: f32, pool: &WorkerPool) {
    if (contrast - 1.0).abs() < EPSILON {
        return;
    }
    let c = contrast.clamp(MIN_CONTRAST, MAX_CONTRAST);
    trace!(contrast = c, "contrast");
    pool.map_pixels(image, |[r, g, b]| {
        [contrast_value(r, c), contrast_value(g, c), contrast_value(b, c)]
    });
}

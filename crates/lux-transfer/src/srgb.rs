//! sRGB transfer function.
//!
//! Piecewise: a linear segment near black and a 1/2.4 power curve above.
//! Used at the display boundary only; all processing stays linear.
//!
//! # Range
//!
//! - Input/Output: [0, 1]. The `*_u8` helpers clamp.
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

use std::sync::OnceLock;

use lux_core::Rgb;

/// Linear-segment threshold on the linear side.
pub const LINEAR_CUTOFF: f32 = 0.0031308;

/// Linear-segment threshold on the encoded side.
pub const ENCODED_CUTOFF: f32 = 0.04045;

static DECODE_LUT: OnceLock<[f32; 256]> = OnceLock::new();

/// sRGB EOTF: decodes encoded values to linear light.
///
/// ```text
/// if V <= 0.04045:  L = V / 12.92
/// else:             L = ((V + 0.055) / 1.055)^2.4
/// ```
///
/// # Example
///
/// ```rust
/// use lux_transfer::srgb::eotf;
///
/// let linear = eotf(0.5);
/// assert!((linear - 0.214).abs() < 0.01);
/// ```
#[inline]
pub fn eotf(v: f32) -> f32 {
    if v <= ENCODED_CUTOFF {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB OETF: encodes linear light.
///
/// ```text
/// if L <= 0.0031308:  V = L * 12.92
/// else:               V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn oetf(l: f32) -> f32 {
    if l <= LINEAR_CUTOFF {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Applies the EOTF to an RGB triplet.
#[inline]
pub fn eotf_rgb(rgb: Rgb) -> Rgb {
    [eotf(rgb[0]), eotf(rgb[1]), eotf(rgb[2])]
}

/// Applies the OETF to an RGB triplet.
#[inline]
pub fn oetf_rgb(rgb: Rgb) -> Rgb {
    [oetf(rgb[0]), oetf(rgb[1]), oetf(rgb[2])]
}

/// Clamps to [0, 1], encodes, scales to [0, 255], rounds.
#[inline]
pub fn encode_u8(l: f32) -> u8 {
    // NaN clamps to 0 through max/min ordering
    let l = l.max(0.0).min(1.0);
    (oetf(l) * 255.0).round() as u8
}

/// Encoded value in [0, 255] as a float, without rounding.
///
/// Input to error-diffusion quantizers.
#[inline]
pub fn encode_unquantized(l: f32) -> f32 {
    oetf(l.max(0.0).min(1.0)) * 255.0
}

/// Decodes an 8-bit code value to linear light via a 256-entry table.
#[inline]
pub fn decode_u8(v: u8) -> f32 {
    decode_table()[v as usize]
}

/// The 256-entry decode table, built on first use.
pub fn decode_table() -> &'static [f32; 256] {
    DECODE_LUT.get_or_init(|| {
        let mut lut = [0.0f32; 256];
        for (i, v) in lut.iter_mut().enumerate() {
            *v = eotf(i as f32 / 255.0);
        }
        lut
    })
}

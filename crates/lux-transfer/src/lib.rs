//! # lux-transfer
//!
//! Transfer functions between scene-linear light and encoded or perceptual
//! scales.
//!
//! | Module | Direction | Use |
//! |--------|-----------|-----|
//! | [`srgb`] | linear <-> display | final 8-bit encoding, preview re-linearization |
//! | [`lstar`] | luminance <-> CIE L* | tone-region weighting |
//!
//! # Usage
//!
//! ```rust
//! use lux_transfer::{lstar, srgb};
//!
//! let encoded = srgb::oetf(0.18);
//! assert!((srgb::eotf(encoded) - 0.18).abs() < 1e-5);
//!
//! let l = lstar::from_luminance(0.18);
//! assert!((l - 49.5).abs() < 0.1);
//! ```
//!
//! # Dependencies
//!
//! - `lux-core` - [`Rgb`](lux_core::Rgb) alias

#![warn(missing_docs)]

pub mod lstar;
pub mod srgb;

pub use lstar::{from_luminance as lstar_from_luminance, to_luminance as lstar_to_luminance};
pub use srgb::{eotf as srgb_eotf, oetf as srgb_oetf};

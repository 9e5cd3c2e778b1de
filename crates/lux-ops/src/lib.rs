//! # lux-ops
//!
//! Pixel kernels for linear-light RAW development.
//!
//! Every kernel takes `&mut LinearImage`, mutates it in place, and runs on
//! a [`WorkerPool`](lux_core::WorkerPool). Parameters are clamped to their
//! documented ranges, and a near-zero parameter returns without touching
//! the image, so neutral settings are bit-identical no-ops.
//!
//! # Modules
//!
//! - [`exposure_contrast`] - exposure gain, pivoted contrast
//! - [`tone_regions`] - highlights, shadows, whites, blacks on L*
//! - [`temperature`] - white balance along the Planckian locus
//! - [`grading`] - per-region temperature/tint
//! - [`saturation`] - saturation and vibrance
//! - [`hsl`] - 8-segment hue/saturation/lightness
//! - [`tone_curve`] - spline point curves baked into LUTs
//! - [`detail`] - clarity, texture, noise reduction via the filter engine
//! - [`sharpen`] - luminance unsharp mask
//! - [`dehaze`] - dark-channel haze removal
//! - [`effects`] - vignette, grain
//! - [`display`] - linear to 8-bit sRGB and back
//!
//! # Example
//!
//! ```rust
//! use lux_core::{LinearImage, WorkerPool};
//! use lux_ops::display::{DisplayOptions, linear_to_display};
//! use lux_ops::exposure_contrast::apply_exposure;
//!
//! let pool = WorkerPool::global();
//! let mut img = LinearImage::filled(4, 4, [0.5; 3]);
//! apply_exposure(&mut img, 1.0, pool);
//! let out = linear_to_display(&img, &DisplayOptions::default(), pool);
//! assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod blur;
pub mod dehaze;
pub mod detail;
pub mod display;
pub mod effects;
pub mod exposure_contrast;
pub mod grading;
pub mod hsl;
pub mod saturation;
pub mod sharpen;
pub mod temperature;
pub mod tone_curve;
pub mod tone_regions;

/// Parameters with a smaller magnitude are treated as zero.
pub const EPSILON: f32 = 1e-4;

pub use display::{DisplayOptions, display_to_linear, linear_to_display, linear_to_display_into};
pub use grading::ColorGrading;
pub use hsl::HslParams;
pub use tone_curve::{CurvePoint, ToneCurveParams};
pub use tone_regions::ToneRegions;

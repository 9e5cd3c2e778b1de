//! # lux-core
//!
//! Core types for linear-light RAW development.
//!
//! - [`LinearImage`] - planar scene-linear RGB buffer mutated in place by every stage
//! - [`OutputImage`] - 8-bit RGBA display buffer
//! - [`RawMetadata`], [`CfaPattern`] - capture metadata from the RAW container
//! - [`WorkerPool`] - reusable fork/join pool used by all pixel kernels
//! - [`luminance_rec709`] - the single luminance definition used everywhere
//!
//! ## Crate Structure
//!
//! All other lux crates depend on `lux-core`:
//!
//! ```text
//! lux-core (this crate)
//!    ^
//!    |
//!    +-- lux-transfer (sRGB, CIE L*)
//!    +-- lux-raw (container parsing, demosaic)
//!    +-- lux-filter (bilateral filter engine)
//!    +-- lux-ops (color kernels, display conversion)
//!    +-- lux-pipeline (orchestration)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod metadata;
pub mod parallel;
pub mod pixel;

pub use error::*;
pub use image::*;
pub use metadata::*;
pub use parallel::{PlaneRows, WorkerPool, default_workers, row_partition};
pub use pixel::{REC709_LUMA, Rgb, lerp, luminance_rec709, rescale_luminance, smoothstep};

/// Prelude module for convenient imports.
///
/// ```
/// use lux_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::{LinearImage, OutputImage};
    pub use crate::metadata::{CfaColor, CfaPattern, RawMetadata, WhiteBalance};
    pub use crate::parallel::WorkerPool;
    pub use crate::pixel::{Rgb, luminance_rec709};
}

//! # lux-pipeline
//!
//! Orchestrates a development: RAW decode, the colour and detail kernels
//! in their fixed order, and display conversion.
//!
//! ```text
//! RAW file ─▶ lux-raw ─▶ LinearImage ─▶ Pipeline::process ─▶ display ─▶ RGBA
//!                             ▲                 │
//!                     ParameterSet       FilterEngine (shared cache)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use lux_pipeline::{ParameterSet, Pipeline};
//!
//! # fn main() -> lux_pipeline::PipelineResult<()> {
//! let pipeline = Pipeline::new();
//! let meta = lux_raw::read_metadata("shot.nef")?;
//! let params = ParameterSet::from_metadata(&meta);
//! let dev = pipeline.develop_file("shot.nef", &params)?;
//! println!("{}x{} in {:?}", dev.image.width(), dev.image.height(), dev.timings.total());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod params;
pub mod pipeline;

pub use error::{PipelineError, PipelineResult};
pub use params::ParameterSet;
pub use pipeline::{Development, Pipeline, PipelineBuilder, Stage, StageTimings};

pub use lux_ops::{DisplayOptions, HslParams, ToneCurveParams};

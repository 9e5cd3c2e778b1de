//! Edge-aware bilateral filtering for lux.
//!
//! [`FilterEngine`] picks between an exact CPU filter, a separable
//! approximation and an optional GPU kernel, and caches results by content
//! hash. Clarity, texture and noise reduction in `lux-ops` all go through
//! it.
//!
//! # Example
//!
//! ```rust
//! use lux_core::LinearImage;
//! use lux_filter::{FilterConfig, FilterEngine};
//!
//! let engine = FilterEngine::new(FilterConfig::default());
//! let img = LinearImage::filled(32, 32, [0.18; 3]);
//! let smooth = engine.apply_cached(&img, 2.0, 0.1);
//! let again = engine.apply_cached(&img, 2.0, 0.1);
//! assert_eq!(smooth, again);
//! assert_eq!(engine.stats().hits, 1);
//! ```
//!
//! # Features
//!
//! - `wgpu` - GPU backend via wgpu compute shaders

#![warn(missing_docs)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;

#[cfg(feature = "wgpu")]
mod shaders;

pub use backend::{BackendInfo, FilterBackend, GpuDevice, NullGpu, default_gpu, radius_for};
pub use cache::{CacheEntry, FilterCache};
pub use config::FilterConfig;
pub use engine::{FilterEngine, FilterStats};
pub use error::{FilterError, FilterResult};
pub use hash::{HashKey, content_hash};

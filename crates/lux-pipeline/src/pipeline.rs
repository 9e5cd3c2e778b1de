//! Development pipeline.
//!
//! Runs the kernels of `lux-ops` over a [`LinearImage`] in a fixed order:
//!
//! ```text
//! exposure -> temperature -> grading -> tone regions -> contrast -> dehaze
//!   -> tone curve -> hsl -> vibrance -> saturation
//!   -> noise reduction -> texture -> clarity -> sharpening
//!   -> vignette -> grain -> display
//! ```
//!
//! White balance and exposure come first so every later stage sees
//! corrected light. Global tone and colour precede the filter-based
//! detail stages, and the effects run last on the finished image.
//!
//! # Usage
//!
//! ```rust
//! use lux_core::LinearImage;
//! use lux_pipeline::{ParameterSet, Pipeline};
//!
//! let pipeline = Pipeline::new();
//! let image = LinearImage::filled(8, 8, [0.5; 3]);
//! let params = ParameterSet { exposure: 1.0, ..Default::default() };
//! let out = pipeline.render(&image, &params);
//! assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lux_core::{LinearImage, OutputImage, RawMetadata, WorkerPool};
use lux_filter::{FilterConfig, FilterEngine};
use lux_ops::{
    dehaze, detail, display, effects, exposure_contrast, grading, hsl, saturation, sharpen, temperature, tone_curve,
    tone_regions,
};
use lux_raw::{DecodeOptions, RawReader};
use tracing::{debug, debug_span, info};

use crate::error::PipelineResult;
use crate::params::ParameterSet;

// ============================================================================
// Stages
// ============================================================================

/// One timed step of a development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Container parse, unpack and demosaic
    Decode,
    /// Exposure gain
    Exposure,
    /// White balance
    Temperature,
    /// Per-region grading
    Grading,
    /// Highlights, shadows, whites, blacks
    ToneRegions,
    /// Pivoted contrast
    Contrast,
    /// Haze removal
    Dehaze,
    /// Point curves
    ToneCurve,
    /// Per-hue adjustments
    Hsl,
    /// Vibrance
    Vibrance,
    /// Saturation
    Saturation,
    /// Bilateral smoothing
    NoiseReduction,
    /// Fine detail
    Texture,
    /// Midtone local contrast
    Clarity,
    /// Unsharp mask
    Sharpening,
    /// Radial falloff
    Vignette,
    /// Photon noise
    Grain,
    /// Linear to 8-bit sRGB
    Display,
}

impl Stage {
    /// Kernel stages in execution order.
    pub const KERNELS: [Stage; 16] = [
        Stage::Exposure,
        Stage::Temperature,
        Stage::Grading,
        Stage::ToneRegions,
        Stage::Contrast,
        Stage::Dehaze,
        Stage::ToneCurve,
        Stage::Hsl,
        Stage::Vibrance,
        Stage::Saturation,
        Stage::NoiseReduction,
        Stage::Texture,
        Stage::Clarity,
        Stage::Sharpening,
        Stage::Vignette,
        Stage::Grain,
    ];

    /// Short lowercase name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Exposure => "exposure",
            Stage::Temperature => "temperature",
            Stage::Grading => "grading",
            Stage::ToneRegions => "tone_regions",
            Stage::Contrast => "contrast",
            Stage::Dehaze => "dehaze",
            Stage::ToneCurve => "tone_curve",
            Stage::Hsl => "hsl",
            Stage::Vibrance => "vibrance",
            Stage::Saturation => "saturation",
            Stage::NoiseReduction => "noise_reduction",
            Stage::Texture => "texture",
            Stage::Clarity => "clarity",
            Stage::Sharpening => "sharpening",
            Stage::Vignette => "vignette",
            Stage::Grain => "grain",
            Stage::Display => "display",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time per executed stage, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    entries: Vec<(Stage, Duration)>,
}

impl StageTimings {
    /// Appends a stage.
    pub fn push(&mut self, stage: Stage, elapsed: Duration) {
        self.entries.push((stage, elapsed));
    }

    /// Appends every entry of `other`.
    pub fn extend(&mut self, other: StageTimings) {
        self.entries.extend(other.entries);
    }

    /// Recorded stages with their durations.
    pub fn entries(&self) -> &[(Stage, Duration)] {
        &self.entries
    }

    /// Stages in the order they ran.
    pub fn stages(&self) -> Vec<Stage> {
        self.entries.iter().map(|(s, _)| *s).collect()
    }

    /// Time spent in `stage`, if it ran.
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.entries.iter().find(|(s, _)| *s == stage).map(|(_, d)| *d)
    }

    /// Sum over all stages.
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }

    /// `true` if nothing ran.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The slowest stage.
    pub fn slowest(&self) -> Option<(Stage, Duration)> {
        self.entries.iter().copied().max_by_key(|(_, d)| *d)
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (stage, d)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {:.2}ms", stage, d.as_secs_f64() * 1e3)?;
        }
        Ok(())
    }
}

fn timed<F: FnOnce()>(timings: &mut StageTimings, stage: Stage, f: F) {
    let span = debug_span!("stage", name = stage.name());
    let _enter = span.enter();
    let start = Instant::now();
    f();
    let elapsed = start.elapsed();
    debug!(elapsed_us = elapsed.as_micros() as u64, "stage done");
    timings.push(stage, elapsed);
}

// ============================================================================
// Pipeline
// ============================================================================

/// Result of [`Pipeline::develop_file`].
#[derive(Debug, Clone)]
pub struct Development {
    /// Display-ready RGBA
    pub image: OutputImage,
    /// Metadata read from the container
    pub metadata: RawMetadata,
    /// Per-stage timings including decode and display
    pub timings: StageTimings,
}

/// Sequences decode, kernels and display conversion.
///
/// The filter engine is shared: clones of the `Arc` handed to the builder
/// see one cache, so pipelines on different threads reuse each other's
/// bilateral results.
pub struct Pipeline {
    engine: Arc<FilterEngine>,
    pool: Option<Arc<WorkerPool>>,
    reader: RawReader,
}

impl Pipeline {
    /// Pipeline on the process-wide filter engine and worker pool.
    pub fn new() -> Self {
        Self {
            engine: FilterEngine::shared(),
            pool: None,
            reader: RawReader::new(),
        }
    }

    /// Creates a builder for custom configuration.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The filter engine used by detail stages.
    pub fn engine(&self) -> &Arc<FilterEngine> {
        &self.engine
    }

    /// The worker pool used by every kernel.
    pub fn pool(&self) -> &WorkerPool {
        self.pool.as_deref().unwrap_or_else(|| WorkerPool::global())
    }

    /// Options used by [`decode`](Self::decode).
    pub fn decode_options(&self) -> &DecodeOptions {
        self.reader.options()
    }

    /// Reads and demosaics a RAW file.
    pub fn decode<P: AsRef<Path>>(&self, path: P) -> PipelineResult<(LinearImage, RawMetadata)> {
        Ok(self.reader.parse(path)?)
    }

    /// Runs every kernel stage on `image` in place.
    ///
    /// Non-finite or out-of-range sliders are sanitized first.
    pub fn process(&self, image: &mut LinearImage, params: &ParameterSet) -> StageTimings {
        let params = params.checked();
        let mut t = StageTimings::default();
        if params.is_identity() {
            debug!("neutral parameters, skipping kernels");
            return t;
        }
        let pool = self.pool();
        let engine = &*self.engine;
        let regions = params.tone_regions();
        let grades = params.grading();

        timed(&mut t, Stage::Exposure, || {
            exposure_contrast::apply_exposure(image, params.exposure, pool)
        });
        timed(&mut t, Stage::Temperature, || {
            temperature::apply_temperature(image, params.temperature, params.tint, pool)
        });
        timed(&mut t, Stage::Grading, || grading::apply_grading(image, &grades, pool));
        timed(&mut t, Stage::ToneRegions, || {
            tone_regions::apply_tone_regions(image, &regions, pool)
        });
        timed(&mut t, Stage::Contrast, || {
            exposure_contrast::apply_contrast(image, params.contrast, pool)
        });
        timed(&mut t, Stage::Dehaze, || dehaze::apply_dehaze(image, params.dehaze, pool));
        timed(&mut t, Stage::ToneCurve, || {
            if let Some(curves) = &params.tone_curve {
                tone_curve::apply_tone_curves(image, curves, pool);
            }
        });
        timed(&mut t, Stage::Hsl, || {
            if let Some(table) = &params.hsl {
                hsl::apply_hsl(image, table, pool);
            }
        });
        timed(&mut t, Stage::Vibrance, || {
            saturation::apply_vibrance(image, params.vibrance, pool)
        });
        timed(&mut t, Stage::Saturation, || {
            saturation::apply_saturation(image, params.saturation, pool)
        });
        timed(&mut t, Stage::NoiseReduction, || {
            detail::apply_noise_reduction(image, params.noise_reduction, engine, pool)
        });
        timed(&mut t, Stage::Texture, || detail::apply_texture(image, params.texture, engine, pool));
        timed(&mut t, Stage::Clarity, || detail::apply_clarity(image, params.clarity, engine, pool));
        timed(&mut t, Stage::Sharpening, || {
            sharpen::apply_sharpening(image, params.sharpening, pool)
        });
        timed(&mut t, Stage::Vignette, || effects::apply_vignette(image, params.vignette, pool));
        timed(&mut t, Stage::Grain, || {
            effects::apply_grain(image, params.grain, params.grain_seed, pool)
        });

        debug!(total_ms = t.total().as_secs_f64() * 1e3, "kernels done");
        t
    }

    /// Processes `image` in place and converts it into `out`.
    ///
    /// `out` is reallocated when its size does not match.
    pub fn render_into(&self, image: &mut LinearImage, params: &ParameterSet, out: &mut OutputImage) -> StageTimings {
        let mut t = self.process(image, params);
        let pool = self.pool();
        timed(&mut t, Stage::Display, || {
            display::linear_to_display_into(image, out, &params.display, pool)
        });
        t
    }

    /// Renders a copy of `source`, leaving it untouched for re-rendering.
    pub fn render(&self, source: &LinearImage, params: &ParameterSet) -> OutputImage {
        let mut image = source.clone();
        let mut out = OutputImage::new(source.width(), source.height());
        self.render_into(&mut image, params, &mut out);
        out
    }

    /// Decodes a RAW file and renders it.
    pub fn develop_file<P: AsRef<Path>>(&self, path: P, params: &ParameterSet) -> PipelineResult<Development> {
        let path = path.as_ref();
        let mut timings = StageTimings::default();
        let start = Instant::now();
        let (mut image, metadata) = self.decode(path)?;
        timings.push(Stage::Decode, start.elapsed());

        let mut out = OutputImage::new(image.width(), image.height());
        timings.extend(self.render_into(&mut image, params, &mut out));
        info!(
            path = %path.display(),
            width = out.width(),
            height = out.height(),
            synthetic = metadata.synthetic,
            total_ms = timings.total().as_secs_f64() * 1e3,
            "developed"
        );
        Ok(Development {
            image: out,
            metadata,
            timings,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("workers", &self.pool().workers())
            .field("engine", &self.engine)
            .field("decode", self.reader.options())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    engine: Option<Arc<FilterEngine>>,
    filter_config: Option<FilterConfig>,
    workers: Option<usize>,
    decode: Option<DecodeOptions>,
}

impl PipelineBuilder {
    /// Share an existing filter engine.
    pub fn engine(mut self, engine: Arc<FilterEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build a private filter engine with this configuration.
    ///
    /// Ignored when [`engine`](Self::engine) is also set.
    pub fn filter_config(mut self, config: FilterConfig) -> Self {
        self.filter_config = Some(config);
        self
    }

    /// Use a dedicated pool with `n` workers instead of the global one.
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    /// RAW decode options.
    pub fn decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = Some(options);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let engine = match (self.engine, self.filter_config) {
            (Some(engine), _) => engine,
            (None, Some(config)) => Arc::new(FilterEngine::new(config)),
            (None, None) => FilterEngine::shared(),
        };
        let pool = match self.workers {
            Some(n) => Some(Arc::new(WorkerPool::new(n)?)),
            None => None,
        };
        let reader = RawReader::with_options(self.decode.unwrap_or_default());
        Ok(Pipeline { engine, pool, reader })
    }
}

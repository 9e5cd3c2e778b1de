//! User-adjustable development parameters.
//!
//! [`ParameterSet`] is a flat record of independent sliders plus optional
//! tone curves and HSL tables. Every field has a neutral default, so a
//! YAML preset only needs the fields it changes:
//!
//! ```yaml
//! exposure: 0.7
//! contrast: 1.2
//! shadows: 0.3
//! tone_curve:
//!   rgb: [[0.0, 0.0], [0.25, 0.2], [1.0, 1.0]]
//! ```
//!
//! # Slider ranges
//!
//! | field | range | neutral |
//! |-------|-------|---------|
//! | `exposure` | EV, +/-10 | 0 |
//! | `contrast` | multiplier, 0.1-4 | 1 |
//! | `grain`, `sharpening`, `noise_reduction` | 0..1 | 0 |
//! | `grading_blending` | 0..1 | 0.5 |
//! | everything else | -1..1 | 0 |

use std::borrow::Cow;
use std::path::Path;

use lux_core::RawMetadata;
use lux_ops::display::DisplayOptions;
use lux_ops::temperature::KELVIN_RANGE;
use lux_ops::{ColorGrading, EPSILON, HslParams, ToneCurveParams, ToneRegions};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// As-shot temperature that seeds a neutral temperature slider.
pub const REFERENCE_KELVIN: f32 = 5500.0;

/// ISO up to which no noise reduction is seeded.
pub const NR_BASE_ISO: f32 = 400.0;

/// Seeded noise reduction per stop above [`NR_BASE_ISO`].
pub const NR_PER_STOP: f32 = 0.125;

/// Largest seeded noise reduction amount.
pub const NR_MAX_SEED: f32 = 0.5;

/// All user-adjustable values for one development.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Exposure in EV
    pub exposure: f32,
    /// Contrast multiplier around mid-grey, 1 is neutral
    pub contrast: f32,
    /// Global saturation
    pub saturation: f32,
    /// Upper mid-tones on L*
    pub highlights: f32,
    /// Lower mid-tones on L*
    pub shadows: f32,
    /// Near-white tones on L*
    pub whites: f32,
    /// Near-black tones on L*
    pub blacks: f32,
    /// Local midtone contrast
    pub clarity: f32,
    /// Saturation weighted toward muted colours
    pub vibrance: f32,
    /// White balance, positive is warmer
    pub temperature: f32,
    /// White balance, positive is more magenta
    pub tint: f32,

    /// Highlight grading temperature
    pub highlight_temperature: f32,
    /// Highlight grading tint
    pub highlight_tint: f32,
    /// Midtone grading temperature
    pub midtone_temperature: f32,
    /// Midtone grading tint
    pub midtone_tint: f32,
    /// Shadow grading temperature
    pub shadow_temperature: f32,
    /// Shadow grading tint
    pub shadow_tint: f32,
    /// Overlap between grading regions
    pub grading_blending: f32,
    /// Shifts the grading crossovers, positive favours highlights
    pub grading_balance: f32,

    /// Fine detail
    pub texture: f32,
    /// Haze removal
    pub dehaze: f32,
    /// Corner exposure, negative darkens
    pub vignette: f32,
    /// Film grain strength
    pub grain: f32,
    /// Grain noise seed
    pub grain_seed: u64,
    /// Luminance unsharp mask
    pub sharpening: f32,
    /// Edge-preserving smoothing
    pub noise_reduction: f32,

    /// Point curves, `None` when disabled
    pub tone_curve: Option<ToneCurveParams>,
    /// Per-hue adjustments, `None` when disabled
    pub hsl: Option<HslParams>,

    /// Display conversion options
    pub display: DisplayOptions,
}

impl Default for ParameterSet {
    fn default() -> Self {
        let grading = ColorGrading::default();
        Self {
            exposure: 0.0,
            contrast: 1.0,
            saturation: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            clarity: 0.0,
            vibrance: 0.0,
            temperature: 0.0,
            tint: 0.0,
            highlight_temperature: 0.0,
            highlight_tint: 0.0,
            midtone_temperature: 0.0,
            midtone_tint: 0.0,
            shadow_temperature: 0.0,
            shadow_tint: 0.0,
            grading_blending: grading.blending,
            grading_balance: grading.balance,
            texture: 0.0,
            dehaze: 0.0,
            vignette: 0.0,
            grain: 0.0,
            grain_seed: 0,
            sharpening: 0.0,
            noise_reduction: 0.0,
            tone_curve: None,
            hsl: None,
            display: DisplayOptions::default(),
        }
    }
}

/// Valid range of a slider, see the module table.
fn slider_range(field: &str) -> (f32, f32) {
    match field {
        "exposure" => (-10.0, 10.0),
        "contrast" => (0.1, 4.0),
        "grain" | "sharpening" | "noise_reduction" | "grading_blending" => (0.0, 1.0),
        _ => (-1.0, 1.0),
    }
}

// Every f32 slider, for bulk checks.
macro_rules! sliders {
    ($mac:ident) => {
        $mac!(
            exposure,
            contrast,
            saturation,
            highlights,
            shadows,
            whites,
            blacks,
            clarity,
            vibrance,
            temperature,
            tint,
            highlight_temperature,
            highlight_tint,
            midtone_temperature,
            midtone_tint,
            shadow_temperature,
            shadow_tint,
            grading_blending,
            grading_balance,
            texture,
            dehaze,
            vignette,
            grain,
            sharpening,
            noise_reduction
        )
    };
}

impl ParameterSet {
    /// Initial values for a freshly opened file.
    ///
    /// Temperature and tint counter the as-shot white balance relative to
    /// [`REFERENCE_KELVIN`]; noise reduction grows with ISO above
    /// [`NR_BASE_ISO`].
    pub fn from_metadata(meta: &RawMetadata) -> Self {
        let wb = meta.white_balance;
        let temperature = if wb.temperature.is_finite() && wb.temperature > 0.0 {
            ((wb.temperature - REFERENCE_KELVIN) / KELVIN_RANGE).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let tint = if wb.tint.is_finite() { (-wb.tint).clamp(-1.0, 1.0) } else { 0.0 };
        let params = Self {
            temperature,
            tint,
            noise_reduction: noise_reduction_for_iso(meta.iso),
            ..Self::default()
        };
        debug!(
            iso = meta.iso,
            temperature = params.temperature,
            tint = params.tint,
            noise_reduction = params.noise_reduction,
            "parameters seeded from metadata"
        );
        params
    }

    /// `true` when every adjustment is neutral.
    ///
    /// Display options are not adjustments and are ignored.
    pub fn is_identity(&self) -> bool {
        let sliders_neutral = self.exposure.abs() < EPSILON
            && (self.contrast - 1.0).abs() < EPSILON
            && self.saturation.abs() < EPSILON
            && self.tone_regions().is_identity()
            && self.clarity.abs() < EPSILON
            && self.vibrance.abs() < EPSILON
            && self.temperature.abs() < lux_ops::temperature::MIN_SHIFT
            && self.tint.abs() < lux_ops::temperature::MIN_SHIFT
            && self.grading().is_identity()
            && self.texture.abs() < EPSILON
            && self.dehaze.abs() < EPSILON
            && self.vignette.abs() < EPSILON
            && self.grain < EPSILON
            && self.sharpening < EPSILON
            && self.noise_reduction < EPSILON;
        sliders_neutral
            && self.tone_curve.as_ref().is_none_or(ToneCurveParams::is_identity)
            && self.hsl.as_ref().is_none_or(HslParams::is_identity)
    }

    /// Highlights/shadows/whites/blacks as a kernel parameter.
    pub fn tone_regions(&self) -> ToneRegions {
        ToneRegions {
            highlights: self.highlights,
            shadows: self.shadows,
            whites: self.whites,
            blacks: self.blacks,
        }
    }

    /// Per-region grading as a kernel parameter.
    pub fn grading(&self) -> ColorGrading {
        ColorGrading {
            highlight_temperature: self.highlight_temperature,
            highlight_tint: self.highlight_tint,
            midtone_temperature: self.midtone_temperature,
            midtone_tint: self.midtone_tint,
            shadow_temperature: self.shadow_temperature,
            shadow_tint: self.shadow_tint,
            blending: self.grading_blending,
            balance: self.grading_balance,
        }
    }

    /// Replaces NaN and infinite sliders with their defaults and clamps
    /// the rest to their ranges.
    ///
    /// Returns the names of the fields that were changed.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut reset = Vec::new();
        macro_rules! fix {
            ($($field:ident),*) => {
                $(
                    let (lo, hi) = slider_range(stringify!($field));
                    if !self.$field.is_finite() {
                        warn!(field = stringify!($field), "non-finite parameter, using default");
                        self.$field = defaults.$field;
                        reset.push(stringify!($field));
                    } else if !(lo..=hi).contains(&self.$field) {
                        warn!(field = stringify!($field), value = self.$field, lo, hi, "parameter out of range, clamping");
                        self.$field = self.$field.clamp(lo, hi);
                        reset.push(stringify!($field));
                    }
                )*
            };
        }
        sliders!(fix);
        reset
    }

    /// Consuming variant of [`sanitize`](Self::sanitize).
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Borrows `self` when every slider is finite and in range, otherwise
    /// returns a sanitized copy.
    pub fn checked(&self) -> Cow<'_, Self> {
        let mut clean = self.clone();
        if clean.sanitize().is_empty() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(clean)
        }
    }

    /// Parses a YAML preset; missing fields take defaults.
    pub fn from_yaml_str(yaml: &str) -> PipelineResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let params: Self = serde_yaml::from_str(yaml).map_err(|e| PipelineError::Params(e.to_string()))?;
        Ok(params.sanitized())
    }

    /// Loads a YAML preset file.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> PipelineResult<String> {
        serde_yaml::to_string(self).map_err(|e| PipelineError::Params(e.to_string()))
    }

    /// Writes a YAML preset file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Seeded noise reduction for an ISO rating.
pub fn noise_reduction_for_iso(iso: u32) -> f32 {
    let iso = iso as f32;
    if iso <= NR_BASE_ISO {
        return 0.0;
    }
    ((iso / NR_BASE_ISO).log2() * NR_PER_STOP).min(NR_MAX_SEED)
}

//! Three-way colour grading: shadows, midtones and highlights each get
//! their own temperature/tint.
//!
//! Region masks are smoothstep ramps over lightness (L* / 100). `balance`
//! slides both crossovers together, `blending` widens or narrows the
//! overlap. The three white-balance gains are blended by mask weight and
//! applied with luminance preservation, like a global temperature shift.

use lux_core::{LinearImage, Rgb, WorkerPool, luminance_rec709, smoothstep};
use lux_transfer::lstar;
use serde::{Deserialize, Serialize};

use crate::EPSILON;
use crate::temperature::{apply_gains, white_balance_gains};

/// Shadow/midtone crossover at neutral balance.
pub const SHADOW_CROSSOVER: f32 = 0.33;

/// Midtone/highlight crossover at neutral balance.
pub const HIGHLIGHT_CROSSOVER: f32 = 0.66;

/// Per-region grading sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorGrading {
    /// Highlight temperature in [-1, 1]
    pub highlight_temperature: f32,
    /// Highlight tint in [-1, 1]
    pub highlight_tint: f32,
    /// Midtone temperature in [-1, 1]
    pub midtone_temperature: f32,
    /// Midtone tint in [-1, 1]
    pub midtone_tint: f32,
    /// Shadow temperature in [-1, 1]
    pub shadow_temperature: f32,
    /// Shadow tint in [-1, 1]
    pub shadow_tint: f32,
    /// Overlap between regions in [0, 1]
    pub blending: f32,
    /// Crossover shift in [-1, 1]; positive favours shadows
    pub balance: f32,
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            highlight_temperature: 0.0,
            highlight_tint: 0.0,
            midtone_temperature: 0.0,
            midtone_tint: 0.0,
            shadow_temperature: 0.0,
            shadow_tint: 0.0,
            blending: 0.5,
            balance: 0.0,
        }
    }
}

impl ColorGrading {
    /// `true` when no region has a colour shift.
    pub fn is_identity(&self) -> bool {
        [
            self.highlight_temperature,
            self.highlight_tint,
            self.midtone_temperature,
            self.midtone_tint,
            self.shadow_temperature,
            self.shadow_tint,
        ]
        .iter()
        .all(|v| v.abs() < EPSILON)
    }

    /// Mask weights `[shadow, midtone, highlight]` at lightness `l` in [0, 1].
    ///
    /// Weights are non-negative and sum to one.
    pub fn region_weights(&self, l: f32) -> [f32; 3] {
        let shift = self.balance.clamp(-1.0, 1.0) * 0.2;
        let half = 0.05 + self.blending.clamp(0.0, 1.0) * 0.15;
        let se = SHADOW_CROSSOVER + shift;
        let he = HIGHLIGHT_CROSSOVER + shift;
        let shadow = 1.0 - smoothstep(se - half, se + half, l);
        let highlight = smoothstep(he - half, he + half, l);
        let mid = (1.0 - shadow - highlight).max(0.0);
        let sum = shadow + mid + highlight;
        [shadow / sum, mid / sum, highlight / sum]
    }
}

fn gains_or_unit(temperature: f32, tint: f32) -> Rgb {
    white_balance_gains(temperature, tint).unwrap_or([1.0; 3])
}

/// Applies per-region grading.
pub fn apply_grading(image: &mut LinearImage, grading: &ColorGrading, pool: &WorkerPool) {
    if grading.is_identity() {
        return;
    }
    let shadow = gains_or_unit(grading.shadow_temperature, grading.shadow_tint);
    let mid = gains_or_unit(grading.midtone_temperature, grading.midtone_tint);
    let high = gains_or_unit(grading.highlight_temperature, grading.highlight_tint);
    pool.map_pixels(image, |rgb| {
        let l = (lstar::from_luminance(luminance_rec709(rgb)) / 100.0).clamp(0.0, 1.0);
        let [ws, wm, wh] = grading.region_weights(l);
        let gains = [
            shadow[0] * ws + mid[0] * wm + high[0] * wh,
            shadow[1] * ws + mid[1] * wm + high[1] * wh,
            shadow[2] * ws + mid[2] * wm + high[2] * wh,
        ];
        apply_gains(rgb, gains)
    });
}

//! Sensor and capture metadata read from a RAW container.

use serde::{Deserialize, Serialize};

/// One photosite color of a Bayer mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfaColor {
    /// Red filter
    Red,
    /// Green filter
    Green,
    /// Blue filter
    Blue,
}

impl CfaColor {
    /// Plane index (R=0, G=1, B=2).
    #[inline]
    pub fn channel(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }

    /// Decodes a TIFF-EP CFAPattern byte (0 = red, 1 = green, 2 = blue).
    pub fn from_tiff(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Red),
            1 => Some(Self::Green),
            2 => Some(Self::Blue),
            _ => None,
        }
    }
}

/// 2x2 color filter array layout, row-major: `[(0,0), (1,0), (0,1), (1,1)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfaPattern(pub [CfaColor; 4]);

impl CfaPattern {
    /// Red-green / green-blue.
    pub const RGGB: Self = Self([CfaColor::Red, CfaColor::Green, CfaColor::Green, CfaColor::Blue]);
    /// Blue-green / green-red.
    pub const BGGR: Self = Self([CfaColor::Blue, CfaColor::Green, CfaColor::Green, CfaColor::Red]);
    /// Green-red / blue-green.
    pub const GRBG: Self = Self([CfaColor::Green, CfaColor::Red, CfaColor::Blue, CfaColor::Green]);
    /// Green-blue / red-green.
    pub const GBRG: Self = Self([CfaColor::Green, CfaColor::Blue, CfaColor::Red, CfaColor::Green]);

    /// Color of the photosite at `(x, y)`; row and column parity select the entry.
    #[inline]
    pub fn color_at(&self, x: usize, y: usize) -> CfaColor {
        self.0[(y & 1) * 2 + (x & 1)]
    }

    /// Builds a pattern from four TIFF-EP codes.
    ///
    /// Only layouts with one red, two greens and one blue are accepted.
    pub fn from_tiff(codes: [u8; 4]) -> Option<Self> {
        let mut colors = [CfaColor::Green; 4];
        for (slot, &code) in colors.iter_mut().zip(codes.iter()) {
            *slot = CfaColor::from_tiff(code)?;
        }
        let count = |c| colors.iter().filter(|&&v| v == c).count();
        (count(CfaColor::Red) == 1 && count(CfaColor::Green) == 2 && count(CfaColor::Blue) == 1)
            .then_some(Self(colors))
    }

    /// Short name such as `"RGGB"`.
    pub fn name(&self) -> String {
        self.0
            .iter()
            .map(|c| match c {
                CfaColor::Red => 'R',
                CfaColor::Green => 'G',
                CfaColor::Blue => 'B',
            })
            .collect()
    }
}

impl Default for CfaPattern {
    fn default() -> Self {
        Self::RGGB
    }
}

/// As-shot white balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalance {
    /// Correlated color temperature in Kelvin
    pub temperature: f32,
    /// Green/magenta offset, positive toward magenta
    pub tint: f32,
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self {
            temperature: 5500.0,
            tint: 0.0,
        }
    }
}

impl WhiteBalance {
    /// Chromaticity y offset that maps to a tint of 1.
    const TINT_SCALE: f32 = 0.05;

    /// White balance of a white point in CIE xy.
    ///
    /// Temperature uses McCamy's CCT approximation. Tint is the distance
    /// below the daylight locus in units of [`Self::TINT_SCALE`], clamped
    /// to [-1, 1]. Returns `None` for points outside the chromaticity
    /// triangle.
    pub fn from_xy(x: f32, y: f32) -> Option<Self> {
        if !(x.is_finite() && y.is_finite()) || x <= 0.0 || y <= 0.0 || x + y >= 1.0 {
            return None;
        }
        let n = (x - 0.3320) / (0.1858 - y);
        let cct = 449.0 * n * n * n + 3525.0 * n * n + 6823.3 * n + 5520.33;
        if !cct.is_finite() {
            return None;
        }
        let locus_y = -3.0 * x * x + 2.87 * x - 0.275;
        Some(Self {
            temperature: cct.clamp(1000.0, 40000.0),
            tint: ((locus_y - y) / Self::TINT_SCALE).clamp(-1.0, 1.0),
        })
    }

    /// White balance of a DNG AsShotNeutral triple.
    ///
    /// The neutral is read as linear sRGB and converted to xy; there is no
    /// camera color matrix. Returns `None` when a channel is not positive.
    pub fn from_neutral(neutral: [f32; 3]) -> Option<Self> {
        if neutral.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return None;
        }
        let [r, g, b] = neutral;
        let cx = 0.4124 * r + 0.3576 * g + 0.1805 * b;
        let cy = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        let cz = 0.0193 * r + 0.1192 * g + 0.9505 * b;
        let sum = cx + cy + cz;
        Self::from_xy(cx / sum, cy / sum)
    }
}

/// Capture metadata populated once by the RAW reader.
///
/// Only `black_level`/`white_level` and `cfa_pattern` influence pixel
/// math; everything else seeds initial adjustment values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    /// Sensor width in pixels
    pub width: u32,
    /// Sensor height in pixels
    pub height: u32,
    /// Bits per stored sample
    pub bits_per_sample: u16,
    /// ISO speed rating
    pub iso: u32,
    /// Exposure time in seconds
    pub exposure_time: f32,
    /// F-number
    pub aperture: f32,
    /// Focal length in millimetres
    pub focal_length: f32,
    /// As-shot white balance
    pub white_balance: WhiteBalance,
    /// Camera make and model
    pub camera_model: String,
    /// Color space tag, e.g. `"sRGB"` or `"Uncalibrated"`
    pub color_space: String,
    /// Sensor black level in raw units
    pub black_level: u32,
    /// Sensor saturation level in raw units
    pub white_level: u32,
    /// Bayer layout
    pub cfa_pattern: CfaPattern,
    /// `true` when pixels were synthesized instead of decoded
    pub synthetic: bool,
}

impl RawMetadata {
    /// Default black/white levels for a sample bit depth.
    pub fn default_levels(bits_per_sample: u16) -> (u32, u32) {
        match bits_per_sample {
            0..=12 => (128, 4095),
            13 | 14 => (512, 16383),
            _ => (0, 65535),
        }
    }

    /// Exposure time formatted as a shutter speed (`1/250 s`, `2.5 s`).
    pub fn shutter_speed(&self) -> String {
        if self.exposure_time <= 0.0 {
            "unknown".into()
        } else if self.exposure_time < 1.0 {
            format!("1/{:.0} s", 1.0 / self.exposure_time)
        } else {
            format!("{:.1} s", self.exposure_time)
        }
    }
}

impl Default for RawMetadata {
    fn default() -> Self {
        let (black_level, white_level) = Self::default_levels(14);
        Self {
            width: 0,
            height: 0,
            bits_per_sample: 14,
            iso: 100,
            exposure_time: 0.0,
            aperture: 0.0,
            focal_length: 0.0,
            white_balance: WhiteBalance::default(),
            camera_model: String::new(),
            color_space: "Uncalibrated".into(),
            black_level,
            white_level,
            cfa_pattern: CfaPattern::RGGB,
            synthetic: false,
        }
    }
}

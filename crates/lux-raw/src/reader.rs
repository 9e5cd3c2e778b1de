//! RAW reader: container → metadata + demosaiced [`LinearImage`].
//!
//! # Failure policy
//!
//! | situation | result |
//! |-----------|--------|
//! | file cannot be opened | `Err(RawError::Io)` |
//! | no II/MM marker, extension not whitelisted | `Err(RawError::InvalidHeader)` |
//! | no II/MM marker, whitelisted extension (CR3, RAF, ...) | placeholder, default size |
//! | no CFA directory, no strips, zero dimensions | placeholder, default size |
//! | structure or strip decoding fails part-way | placeholder, failure size |
//!
//! Placeholders carry `RawMetadata::synthetic = true` and log a warning.

use std::path::Path;

use lux_core::{CfaPattern, LinearImage, RawMetadata, WhiteBalance};
use tracing::{debug, info, warn};

use crate::decode::{Levels, read_bayer};
use crate::demosaic::demosaic_with;
use crate::detect::Detection;
use crate::error::{RawError, RawResult};
use crate::synthetic;
use crate::tiff::{Ifd, TiffFile, tags};

/// Options for [`RawReader`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Run the directional refinement pass after bilinear interpolation.
    pub refine: bool,
    /// Placeholder size when strips or dimensions are missing.
    pub fallback_size: (u32, u32),
    /// Placeholder size when decoding fails part-way.
    pub failure_size: (u32, u32),
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            refine: true,
            fallback_size: synthetic::DEFAULT_SIZE,
            failure_size: synthetic::FAILURE_SIZE,
        }
    }
}

/// RAW container reader.
#[derive(Debug, Clone, Default)]
pub struct RawReader {
    options: DecodeOptions,
}

impl RawReader {
    /// Creates a reader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader with custom options.
    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Reader options.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Parses a RAW file from disk.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use lux_raw::RawReader;
    ///
    /// let (image, meta) = RawReader::new().parse("DSC01234.ARW")?;
    /// println!("{} {}x{} ISO {}", meta.camera_model, image.width(), image.height(), meta.iso);
    /// # Ok::<(), lux_raw::RawError>(())
    /// ```
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> RawResult<(LinearImage, RawMetadata)> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        info!(path = %path.display(), bytes = data.len(), "reading RAW");
        self.parse_bytes(&data, Some(path))
    }

    /// Parses an in-memory RAW file. `path` is only used for extension
    /// detection and log messages.
    pub fn parse_bytes(&self, data: &[u8], path: Option<&Path>) -> RawResult<(LinearImage, RawMetadata)> {
        match Detection::detect(data, path) {
            Detection::Tiff(_) => {}
            Detection::Extension(format) => {
                warn!(
                    format = format.extension(),
                    "no TIFF structure in whitelisted RAW file, using placeholder"
                );
                return Ok(synthetic::placeholder(self.options.fallback_size, RawMetadata::default()));
            }
            Detection::Unknown => {
                return Err(RawError::InvalidHeader(
                    "not a TIFF-family container (expected II or MM)".into(),
                ));
            }
        }

        let tiff = match TiffFile::parse(data) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "TIFF structure unreadable, using placeholder");
                return Ok(synthetic::placeholder(self.options.failure_size, RawMetadata::default()));
            }
        };

        let Some(raw_ifd) = select_raw_ifd(&tiff) else {
            warn!("no sensor directory found, using placeholder");
            let meta = read_metadata(&tiff, None);
            return Ok(synthetic::placeholder(self.options.fallback_size, meta));
        };
        let meta = read_metadata(&tiff, Some(raw_ifd));
        if meta.width == 0 || meta.height == 0 || !raw_ifd.contains(tags::STRIP_OFFSETS) {
            warn!(width = meta.width, height = meta.height, "sensor data not locatable, using placeholder");
            return Ok(synthetic::placeholder(self.options.fallback_size, meta));
        }

        let levels = Levels::new(meta.black_level, meta.white_level);
        let decoded = read_bayer(&tiff, raw_ifd, meta.width, meta.height, meta.bits_per_sample, levels)
            .and_then(|bayer| {
                demosaic_with(&bayer, meta.width, meta.height, meta.cfa_pattern, self.options.refine)
            });
        match decoded {
            Ok(image) => {
                debug!(model = %meta.camera_model, iso = meta.iso, "RAW decoded");
                Ok((image, meta))
            }
            Err(e) => {
                warn!(error = %e, "sensor data decode failed, using placeholder");
                Ok(synthetic::placeholder(self.options.failure_size, meta))
            }
        }
    }

    /// Reads only the metadata of a RAW file.
    pub fn metadata<P: AsRef<Path>>(&self, path: P) -> RawResult<RawMetadata> {
        let data = std::fs::read(path.as_ref())?;
        metadata_from_bytes(&data, Some(path.as_ref()))
    }
}

/// Reads metadata from an in-memory RAW file without decoding pixels.
pub fn metadata_from_bytes(data: &[u8], path: Option<&Path>) -> RawResult<RawMetadata> {
    match Detection::detect(data, path) {
        Detection::Tiff(_) => {
            let tiff = TiffFile::parse(data)?;
            Ok(read_metadata(&tiff, select_raw_ifd(&tiff)))
        }
        Detection::Extension(_) => Ok(RawMetadata {
            synthetic: true,
            ..RawMetadata::default()
        }),
        Detection::Unknown => Err(RawError::InvalidHeader("not a TIFF-family container".into())),
    }
}

/// Largest directory that looks like sensor data: 10-16 bits per sample,
/// one sample per pixel, not JPEG compressed.
fn select_raw_ifd<'t>(tiff: &'t TiffFile<'_>) -> Option<&'t Ifd> {
    tiff.ifds
        .iter()
        .filter(|ifd| {
            let bits = tiff.u32_tag(ifd, tags::BITS_PER_SAMPLE).unwrap_or(0);
            let spp = tiff.u32_tag(ifd, tags::SAMPLES_PER_PIXEL).unwrap_or(1);
            let compression = tiff.u32_tag(ifd, tags::COMPRESSION).unwrap_or(1);
            (10..=16).contains(&bits) && spp == 1 && !matches!(compression, 6 | 7)
        })
        .max_by_key(|ifd| {
            let cfa = tiff.u32_tag(ifd, tags::PHOTOMETRIC) == Some(tags::PHOTOMETRIC_CFA);
            let w = tiff.u32_tag(ifd, tags::IMAGE_WIDTH).unwrap_or(0) as u64;
            let h = tiff.u32_tag(ifd, tags::IMAGE_LENGTH).unwrap_or(0) as u64;
            (cfa, w * h)
        })
}

fn read_metadata(tiff: &TiffFile<'_>, raw: Option<&Ifd>) -> RawMetadata {
    let mut meta = RawMetadata::default();

    if let Some(ifd) = raw {
        meta.width = tiff.u32_tag(ifd, tags::IMAGE_WIDTH).unwrap_or(0);
        meta.height = tiff.u32_tag(ifd, tags::IMAGE_LENGTH).unwrap_or(0);
        meta.bits_per_sample = tiff
            .u32_tag(ifd, tags::BITS_PER_SAMPLE)
            .map(|b| b.min(16) as u16)
            .unwrap_or(14);
        let (black, white) = RawMetadata::default_levels(meta.bits_per_sample);
        let max = sample_max(meta.bits_per_sample);
        meta.black_level = level_tag(tiff, ifd, tags::BLACK_LEVEL, max).unwrap_or(black);
        meta.white_level = level_tag(tiff, ifd, tags::WHITE_LEVEL, max).unwrap_or(white);
        meta.cfa_pattern = cfa_tag(tiff, ifd).unwrap_or(CfaPattern::RGGB);
    }
    if let Some(wb) = white_balance_tag(tiff) {
        meta.white_balance = wb;
    }

    let make = tiff.find_ascii(tags::MAKE);
    let model = tiff.find_ascii(tags::MODEL);
    meta.camera_model = match (make, model) {
        (Some(make), Some(model)) if !model.starts_with(&make) => format!("{} {}", make, model),
        (_, Some(model)) => model,
        (Some(make), None) => make,
        (None, None) => String::new(),
    };

    if let Some(exif) = &tiff.exif {
        if let Some(iso) = tiff.u32_tag(exif, tags::ISO) {
            meta.iso = iso;
        }
        meta.exposure_time = tiff.number_tag(exif, tags::EXPOSURE_TIME).unwrap_or(0.0);
        meta.aperture = tiff.number_tag(exif, tags::F_NUMBER).unwrap_or(0.0);
        meta.focal_length = tiff.number_tag(exif, tags::FOCAL_LENGTH).unwrap_or(0.0);
        meta.color_space = match tiff.u32_tag(exif, tags::COLOR_SPACE) {
            Some(1) => "sRGB".into(),
            Some(2) => "Adobe RGB".into(),
            _ => "Uncalibrated".into(),
        };
    }
    meta
}

fn sample_max(bits: u16) -> u32 {
    (1u32 << bits.clamp(1, 16)) - 1
}

/// Level tag value, rejected when it does not fit in `max`.
fn level_tag(tiff: &TiffFile<'_>, ifd: &Ifd, tag: u16, max: u32) -> Option<u32> {
    let v = tiff.integer(ifd.get(tag)?)?;
    if v > max {
        warn!(tag, value = v, max, "level tag exceeds sample range, using defaults");
        return None;
    }
    Some(v)
}

/// As-shot white balance from AsShotWhiteXY, else AsShotNeutral.
fn white_balance_tag(tiff: &TiffFile<'_>) -> Option<WhiteBalance> {
    let from_xy = tiff
        .find(tags::AS_SHOT_WHITE_XY)
        .and_then(|(_, e)| tiff.numbers(e))
        .filter(|v| v.len() >= 2)
        .and_then(|v| WhiteBalance::from_xy(v[0], v[1]));
    from_xy.or_else(|| {
        tiff.find(tags::AS_SHOT_NEUTRAL)
            .and_then(|(_, e)| tiff.numbers(e))
            .filter(|v| v.len() >= 3)
            .and_then(|v| WhiteBalance::from_neutral([v[0], v[1], v[2]]))
    })
}

fn cfa_tag(tiff: &TiffFile<'_>, ifd: &Ifd) -> Option<CfaPattern> {
    let codes = tiff.values_u32(ifd.get(tags::CFA_PATTERN)?).ok()?;
    if codes.len() != 4 {
        return None;
    }
    CfaPattern::from_tiff([codes[0] as u8, codes[1] as u8, codes[2] as u8, codes[3] as u8])
}

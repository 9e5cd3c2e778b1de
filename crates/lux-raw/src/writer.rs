//! Minimal CFA TIFF writer.
//!
//! Produces single-IFD Bayer files in the layout [`crate::RawReader`]
//! decodes, plus an optional EXIF directory and embedded JPEG. Used to
//! generate fixtures and sample files.
//!
//! ```text
//! header | IFD0 | EXIF IFD | out-of-line values | preview JPEG | strips
//! ```
//!
//! # Example
//!
//! ```rust
//! use lux_raw::writer::{BayerTiffWriter, SampleLayout};
//!
//! let bytes = BayerTiffWriter::new(4, 4)
//!     .bits(14)
//!     .layout(SampleLayout::Packed12)
//!     .iso(400)
//!     .build(&[8192u16; 16]);
//! assert_eq!(&bytes[0..2], b"II");
//! ```

use crate::detect::ByteOrder;
use crate::tiff::tags;

/// How samples are stored in the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// One 16-bit word per sample, file byte order
    Unpacked16,
    /// Two 12-bit samples in three bytes, most significant bits first
    Packed12,
}

#[derive(Debug, Clone)]
struct Field {
    tag: u16,
    ty: u16,
    count: u32,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Offsets {
    exif: u32,
    preview: u32,
    strips: u32,
}

/// Builder for a CFA TIFF file.
#[derive(Debug, Clone)]
pub struct BayerTiffWriter {
    width: u32,
    height: u32,
    bits: u16,
    order: ByteOrder,
    layout: SampleLayout,
    strips: u32,
    model: Option<String>,
    make: Option<String>,
    iso: Option<u32>,
    exposure: Option<(u32, u32)>,
    aperture: Option<(u32, u32)>,
    focal_length: Option<(u32, u32)>,
    cfa: [u8; 4],
    levels: Option<(u32, u32)>,
    rational_levels: Option<[(u32, u32); 2]>,
    as_shot_neutral: Option<[(u32, u32); 3]>,
    as_shot_white_xy: Option<[(u32, u32); 2]>,
    preview: Option<Vec<u8>>,
    omit_strips: bool,
    strip_byte_count: Option<u32>,
    truncate: usize,
}

impl BayerTiffWriter {
    /// New 14-bit little-endian RGGB writer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: 14,
            order: ByteOrder::LittleEndian,
            layout: SampleLayout::Unpacked16,
            strips: 1,
            model: None,
            make: None,
            iso: None,
            exposure: None,
            aperture: None,
            focal_length: None,
            cfa: [0, 1, 1, 2],
            levels: None,
            rational_levels: None,
            as_shot_neutral: None,
            as_shot_white_xy: None,
            preview: None,
            omit_strips: false,
            strip_byte_count: None,
            truncate: 0,
        }
    }

    /// Declared bits per sample.
    pub fn bits(mut self, bits: u16) -> Self {
        self.bits = bits;
        self
    }

    /// File byte order.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Strip sample layout.
    pub fn layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Number of strips the rows are split into.
    pub fn strips(mut self, n: u32) -> Self {
        self.strips = n.clamp(1, self.height.max(1));
        self
    }

    /// Camera model string.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Camera make string.
    pub fn make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    /// ISO speed.
    pub fn iso(mut self, iso: u32) -> Self {
        self.iso = Some(iso);
        self
    }

    /// Exposure time as a rational.
    pub fn exposure(mut self, num: u32, den: u32) -> Self {
        self.exposure = Some((num, den));
        self
    }

    /// F-number as a rational.
    pub fn aperture(mut self, num: u32, den: u32) -> Self {
        self.aperture = Some((num, den));
        self
    }

    /// Focal length as a rational.
    pub fn focal_length(mut self, num: u32, den: u32) -> Self {
        self.focal_length = Some((num, den));
        self
    }

    /// TIFF-EP CFA codes (0 red, 1 green, 2 blue).
    pub fn cfa(mut self, codes: [u8; 4]) -> Self {
        self.cfa = codes;
        self
    }

    /// DNG black/white level tags.
    pub fn levels(mut self, black: u32, white: u32) -> Self {
        self.levels = Some((black, white));
        self
    }

    /// DNG black/white level tags stored as RATIONAL.
    pub fn rational_levels(mut self, black: (u32, u32), white: (u32, u32)) -> Self {
        self.rational_levels = Some([black, white]);
        self
    }

    /// DNG AsShotNeutral as three RATIONAL channel multipliers.
    pub fn as_shot_neutral(mut self, neutral: [(u32, u32); 3]) -> Self {
        self.as_shot_neutral = Some(neutral);
        self
    }

    /// DNG AsShotWhiteXY as two RATIONAL chromaticity coordinates.
    pub fn as_shot_white_xy(mut self, x: (u32, u32), y: (u32, u32)) -> Self {
        self.as_shot_white_xy = Some([x, y]);
        self
    }

    /// Embeds a JPEG referenced by JPEGInterchangeFormat tags.
    pub fn preview(mut self, jpeg: Vec<u8>) -> Self {
        self.preview = Some(jpeg);
        self
    }

    /// Leaves out StripOffsets/StripByteCounts.
    pub fn omit_strips(mut self) -> Self {
        self.omit_strips = true;
        self
    }

    /// Declares `count` bytes for every strip regardless of the data written.
    pub fn strip_byte_count(mut self, count: u32) -> Self {
        self.strip_byte_count = Some(count);
        self
    }

    /// Drops the last `bytes` of pixel data while keeping declared counts.
    pub fn truncate(mut self, bytes: usize) -> Self {
        self.truncate = bytes;
        self
    }

    fn u16b(&self, v: u16) -> [u8; 2] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    fn u32b(&self, v: u32) -> [u8; 4] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    fn short(&self, tag: u16, v: u16) -> Field {
        Field {
            tag,
            ty: 3,
            count: 1,
            payload: self.u16b(v).to_vec(),
        }
    }

    fn longs(&self, tag: u16, vs: &[u32]) -> Field {
        Field {
            tag,
            ty: 4,
            count: vs.len() as u32,
            payload: vs.iter().flat_map(|&v| self.u32b(v)).collect(),
        }
    }

    fn ascii(&self, tag: u16, s: &str) -> Field {
        let mut payload = s.as_bytes().to_vec();
        payload.push(0);
        Field {
            tag,
            ty: 2,
            count: payload.len() as u32,
            payload,
        }
    }

    fn rational(&self, tag: u16, v: (u32, u32)) -> Field {
        self.rationals(tag, &[v])
    }

    fn rationals(&self, tag: u16, vs: &[(u32, u32)]) -> Field {
        Field {
            tag,
            ty: 5,
            count: vs.len() as u32,
            payload: vs.iter().flat_map(|&(n, d)| [self.u32b(n), self.u32b(d)].concat()).collect(),
        }
    }

    fn strip_rows(&self) -> Vec<u32> {
        let n = self.strips.max(1);
        let base = self.height / n;
        (0..n)
            .map(|i| if i + 1 == n { self.height - base * (n - 1) } else { base })
            .collect()
    }

    fn encode_samples(&self, samples: &[u16]) -> Vec<u8> {
        match self.layout {
            SampleLayout::Unpacked16 => samples.iter().flat_map(|&s| self.u16b(s)).collect(),
            SampleLayout::Packed12 => {
                let shift = self.bits.saturating_sub(12);
                let mut out = Vec::with_capacity(samples.len() * 3 / 2 + 2);
                for pair in samples.chunks(2) {
                    let a = pair[0] >> shift;
                    let b = pair.get(1).map_or(0, |&v| v >> shift);
                    out.push((a >> 4) as u8);
                    out.push((((a & 0x0F) << 4) | (b >> 8)) as u8);
                    out.push((b & 0xFF) as u8);
                }
                out
            }
        }
    }

    fn strip_bytes(&self, rows: u32) -> u32 {
        let px = rows * self.width;
        match self.layout {
            SampleLayout::Unpacked16 => px * 2,
            SampleLayout::Packed12 => px.div_ceil(2) * 3,
        }
    }

    fn has_exif(&self) -> bool {
        self.iso.is_some()
            || self.exposure.is_some()
            || self.aperture.is_some()
            || self.focal_length.is_some()
    }

    fn fields(&self, off: Offsets) -> (Vec<Field>, Vec<Field>) {
        let mut ifd0 = vec![
            self.longs(tags::NEW_SUBFILE_TYPE, &[0]),
            self.longs(tags::IMAGE_WIDTH, &[self.width]),
            self.longs(tags::IMAGE_LENGTH, &[self.height]),
            self.short(tags::BITS_PER_SAMPLE, self.bits),
            self.short(
                tags::COMPRESSION,
                match self.layout {
                    SampleLayout::Unpacked16 => 1,
                    SampleLayout::Packed12 => 32769,
                },
            ),
            self.short(tags::PHOTOMETRIC, tags::PHOTOMETRIC_CFA as u16),
            self.short(tags::SAMPLES_PER_PIXEL, 1),
            Field {
                tag: tags::CFA_REPEAT_DIM,
                ty: 3,
                count: 2,
                payload: [self.u16b(2), self.u16b(2)].concat(),
            },
            Field {
                tag: tags::CFA_PATTERN,
                ty: 1,
                count: 4,
                payload: self.cfa.to_vec(),
            },
        ];
        if let Some(make) = &self.make {
            ifd0.push(self.ascii(tags::MAKE, make));
        }
        if let Some(model) = &self.model {
            ifd0.push(self.ascii(tags::MODEL, model));
        }
        if !self.omit_strips {
            let rows = self.strip_rows();
            let mut offsets = Vec::with_capacity(rows.len());
            let mut counts = Vec::with_capacity(rows.len());
            let mut at = off.strips;
            for r in rows {
                let n = self.strip_bytes(r);
                offsets.push(at);
                counts.push(self.strip_byte_count.unwrap_or(n));
                at += n;
            }
            ifd0.push(self.longs(tags::STRIP_OFFSETS, &offsets));
            ifd0.push(self.longs(tags::STRIP_BYTE_COUNTS, &counts));
        }
        if let Some(jpeg) = &self.preview {
            ifd0.push(self.longs(tags::JPEG_OFFSET, &[off.preview]));
            ifd0.push(self.longs(tags::JPEG_LENGTH, &[jpeg.len() as u32]));
        }
        if let Some((black, white)) = self.levels {
            ifd0.push(self.longs(tags::BLACK_LEVEL, &[black]));
            ifd0.push(self.longs(tags::WHITE_LEVEL, &[white]));
        }
        if let Some([black, white]) = self.rational_levels {
            ifd0.push(self.rational(tags::BLACK_LEVEL, black));
            ifd0.push(self.rational(tags::WHITE_LEVEL, white));
        }
        if let Some(neutral) = &self.as_shot_neutral {
            ifd0.push(self.rationals(tags::AS_SHOT_NEUTRAL, neutral));
        }
        if let Some(xy) = &self.as_shot_white_xy {
            ifd0.push(self.rationals(tags::AS_SHOT_WHITE_XY, xy));
        }
        let mut exif = Vec::new();
        if self.has_exif() {
            ifd0.push(self.longs(tags::EXIF_IFD, &[off.exif]));
            if let Some(t) = self.exposure {
                exif.push(self.rational(tags::EXPOSURE_TIME, t));
            }
            if let Some(f) = self.aperture {
                exif.push(self.rational(tags::F_NUMBER, f));
            }
            if let Some(iso) = self.iso {
                exif.push(self.short(tags::ISO, iso.min(u16::MAX as u32) as u16));
            }
            if let Some(fl) = self.focal_length {
                exif.push(self.rational(tags::FOCAL_LENGTH, fl));
            }
            exif.push(self.short(tags::COLOR_SPACE, 1));
        }
        ifd0.sort_by_key(|f| f.tag);
        exif.sort_by_key(|f| f.tag);
        (ifd0, exif)
    }

    fn ifd_size(n: usize) -> u32 {
        (2 + 12 * n + 4) as u32
    }

    fn extra_size(fields: &[Field]) -> u32 {
        fields
            .iter()
            .filter(|f| f.payload.len() > 4)
            .map(|f| (f.payload.len() as u32 + 1) & !1)
            .sum()
    }

    fn write_ifd(&self, out: &mut Vec<u8>, fields: &[Field], extra: &mut Vec<u8>, extra_base: u32) {
        out.extend_from_slice(&self.u16b(fields.len() as u16));
        for f in fields {
            out.extend_from_slice(&self.u16b(f.tag));
            out.extend_from_slice(&self.u16b(f.ty));
            out.extend_from_slice(&self.u32b(f.count));
            if f.payload.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..f.payload.len()].copy_from_slice(&f.payload);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&self.u32b(extra_base + extra.len() as u32));
                extra.extend_from_slice(&f.payload);
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
            }
        }
        out.extend_from_slice(&self.u32b(0));
    }

    /// Serializes the file. `samples` holds `width * height` raw values,
    /// missing samples are written as zero.
    pub fn build(&self, samples: &[u16]) -> Vec<u8> {
        let (draft0, draft_exif) = self.fields(Offsets::default());
        let ifd0_size = Self::ifd_size(draft0.len());
        let exif_size = if draft_exif.is_empty() {
            0
        } else {
            Self::ifd_size(draft_exif.len())
        };
        let exif_off = 8 + ifd0_size;
        let extra_off = exif_off + exif_size;
        let extra_len = Self::extra_size(&draft0) + Self::extra_size(&draft_exif);
        let preview_off = extra_off + extra_len;
        let preview_len = self.preview.as_ref().map_or(0, |p| p.len() as u32);
        let offsets = Offsets {
            exif: exif_off,
            preview: preview_off,
            strips: preview_off + preview_len,
        };
        let (ifd0, exif) = self.fields(offsets);

        let mut out = Vec::new();
        out.extend_from_slice(match self.order {
            ByteOrder::LittleEndian => b"II",
            ByteOrder::BigEndian => b"MM",
        });
        out.extend_from_slice(&self.u16b(42));
        out.extend_from_slice(&self.u32b(8));

        let mut extra = Vec::new();
        self.write_ifd(&mut out, &ifd0, &mut extra, extra_off);
        if !exif.is_empty() {
            self.write_ifd(&mut out, &exif, &mut extra, extra_off);
        }
        out.extend_from_slice(&extra);
        if let Some(jpeg) = &self.preview {
            out.extend_from_slice(jpeg);
        }

        let n = self.width as usize * self.height as usize;
        let mut padded = samples.to_vec();
        padded.resize(n, 0);
        let mut pixels = Vec::new();
        let mut row = 0usize;
        for rows in self.strip_rows() {
            let start = row * self.width as usize;
            let end = start + rows as usize * self.width as usize;
            pixels.extend_from_slice(&self.encode_samples(&padded[start..end]));
            row += rows as usize;
        }
        pixels.truncate(pixels.len().saturating_sub(self.truncate));
        out.extend_from_slice(&pixels);
        out
    }
}

//! TIFF container structure: header, IFD chain, sub-IFDs, typed values.
//!
//! Vendor RAW files (ARW, NEF, CR2, DNG, PEF, ...) are TIFF containers
//! with the sensor mosaic in one of the image directories. This module
//! only walks structure; it never interprets pixel data.
//!
//! ```text
//! 0      2      4        8
//! +------+------+--------+
//! | II   | 42   | IFD0   |   header
//! +------+------+--------+
//! IFD:  u16 count | count * 12-byte entries | u32 next
//! entry: u16 tag | u16 type | u32 count | u32 value-or-offset
//! ```
//!
//! Every read is bounds-checked; a malformed file produces
//! [`RawError::Truncated`] rather than a panic.

use std::collections::HashSet;

use tracing::trace;

use crate::detect::ByteOrder;
use crate::error::{RawError, RawResult};

/// Maximum directories followed before giving up on a cyclic chain.
const MAX_IFDS: usize = 64;

/// Maximum entries accepted in one directory.
const MAX_ENTRIES: u16 = 1024;

/// Tag ids used by the reader.
pub mod tags {
    /// NewSubfileType
    pub const NEW_SUBFILE_TYPE: u16 = 0x00FE;
    /// ImageWidth
    pub const IMAGE_WIDTH: u16 = 0x0100;
    /// ImageLength
    pub const IMAGE_LENGTH: u16 = 0x0101;
    /// BitsPerSample
    pub const BITS_PER_SAMPLE: u16 = 0x0102;
    /// Compression
    pub const COMPRESSION: u16 = 0x0103;
    /// PhotometricInterpretation
    pub const PHOTOMETRIC: u16 = 0x0106;
    /// Make
    pub const MAKE: u16 = 0x010F;
    /// Model
    pub const MODEL: u16 = 0x0110;
    /// StripOffsets
    pub const STRIP_OFFSETS: u16 = 0x0111;
    /// SamplesPerPixel
    pub const SAMPLES_PER_PIXEL: u16 = 0x0115;
    /// StripByteCounts
    pub const STRIP_BYTE_COUNTS: u16 = 0x0117;
    /// SubIFDs
    pub const SUB_IFDS: u16 = 0x014A;
    /// JPEGInterchangeFormat
    pub const JPEG_OFFSET: u16 = 0x0201;
    /// JPEGInterchangeFormatLength
    pub const JPEG_LENGTH: u16 = 0x0202;
    /// CFARepeatPatternDim
    pub const CFA_REPEAT_DIM: u16 = 0x828D;
    /// CFAPattern
    pub const CFA_PATTERN: u16 = 0x828E;
    /// ExposureTime
    pub const EXPOSURE_TIME: u16 = 0x829A;
    /// FNumber
    pub const F_NUMBER: u16 = 0x829D;
    /// ExifIFD pointer
    pub const EXIF_IFD: u16 = 0x8769;
    /// ISOSpeedRatings
    pub const ISO: u16 = 0x8827;
    /// FocalLength
    pub const FOCAL_LENGTH: u16 = 0x920A;
    /// ColorSpace
    pub const COLOR_SPACE: u16 = 0xA001;
    /// DNG BlackLevel
    pub const BLACK_LEVEL: u16 = 0xC61A;
    /// DNG WhiteLevel
    pub const WHITE_LEVEL: u16 = 0xC61D;
    /// DNG AsShotNeutral
    pub const AS_SHOT_NEUTRAL: u16 = 0xC628;
    /// DNG AsShotWhiteXY
    pub const AS_SHOT_WHITE_XY: u16 = 0xC629;

    /// PhotometricInterpretation value for a color filter array.
    pub const PHOTOMETRIC_CFA: u32 = 32803;
}

/// TIFF field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// u8
    Byte,
    /// NUL-terminated text
    Ascii,
    /// u16
    Short,
    /// u32
    Long,
    /// u32 / u32
    Rational,
    /// i8
    SByte,
    /// opaque bytes
    Undefined,
    /// i16
    SShort,
    /// i32
    SLong,
    /// i32 / i32
    SRational,
    /// f32
    Float,
    /// f64
    Double,
    /// u32 directory offset
    Ifd,
}

impl FieldType {
    /// Decodes a type code. Unknown codes return `None`.
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            13 => Self::Ifd,
            _ => return None,
        })
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float | Self::Ifd => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Tag id
    pub tag: u16,
    /// Element type
    pub field_type: FieldType,
    /// Element count
    pub count: u32,
    /// Raw 4-byte value/offset field, file byte order
    pub field: [u8; 4],
    /// File offset of `field`
    pub field_offset: u32,
}

impl Entry {
    /// Total payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.count as usize * self.field_type.size()
    }
}

/// An image file directory.
#[derive(Debug, Clone, Default)]
pub struct Ifd {
    /// File offset of the directory
    pub offset: u32,
    /// Entries in file order
    pub entries: Vec<Entry>,
}

impl Ifd {
    /// Looks up an entry by tag.
    pub fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// `true` if the directory holds `tag`.
    pub fn contains(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }
}

/// Parsed TIFF structure borrowing the file bytes.
#[derive(Debug)]
pub struct TiffFile<'a> {
    data: &'a [u8],
    order: ByteOrder,
    /// Main chain followed by SubIFDs, in discovery order
    pub ifds: Vec<Ifd>,
    /// EXIF directory, if any directory points to one
    pub exif: Option<Ifd>,
}

impl<'a> TiffFile<'a> {
    /// Parses the header and every reachable directory.
    ///
    /// # Errors
    ///
    /// [`RawError::InvalidHeader`] if the byte-order marker is missing;
    /// [`RawError::Truncated`] if IFD0 lies outside the file.
    pub fn parse(data: &'a [u8]) -> RawResult<Self> {
        let order = ByteOrder::from_header(data)
            .ok_or_else(|| RawError::InvalidHeader("missing II/MM byte-order marker".into()))?;
        let mut tiff = Self {
            data,
            order,
            ifds: Vec::new(),
            exif: None,
        };
        let magic = tiff.u16_at(2)?;
        if magic != 42 {
            // ORF ("IIRO") and RW2 ("IIU") reuse the TIFF layout with a vendor magic
            trace!(magic, "non-standard TIFF magic");
        }
        let first = tiff.u32_at(4)?;

        let mut visited = HashSet::new();
        let mut pending = vec![first];
        while let Some(offset) = pending.pop() {
            if offset == 0 || tiff.ifds.len() >= MAX_IFDS || !visited.insert(offset) {
                continue;
            }
            let (ifd, next) = match tiff.read_ifd(offset) {
                Ok(v) => v,
                // IFD0 must be readable; later links may dangle
                Err(e) if tiff.ifds.is_empty() => return Err(e),
                Err(e) => {
                    trace!(offset, error = %e, "skipping unreadable IFD");
                    continue;
                }
            };
            if let Some(sub) = ifd.get(tags::SUB_IFDS) {
                for child in tiff.values_u32(sub).unwrap_or_default().into_iter().rev() {
                    pending.push(child);
                }
            }
            if tiff.exif.is_none() {
                if let Some(ptr) = ifd.get(tags::EXIF_IFD) {
                    if let Some(off) = tiff.values_u32(ptr).ok().and_then(|v| v.first().copied()) {
                        tiff.exif = tiff.read_ifd(off).ok().map(|(ifd, _)| ifd);
                    }
                }
            }
            tiff.ifds.push(ifd);
            pending.insert(0, next);
        }
        trace!(ifds = tiff.ifds.len(), exif = tiff.exif.is_some(), "TIFF structure parsed");
        Ok(tiff)
    }

    /// Byte order of the file.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// The underlying file bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Bounds-checked slice of the file.
    pub fn bytes_at(&self, offset: usize, len: usize) -> RawResult<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(RawError::Truncated {
                offset,
                needed: len,
                len: self.data.len(),
            })
    }

    fn u16_at(&self, offset: usize) -> RawResult<u16> {
        let b = self.bytes_at(offset, 2)?;
        Ok(self.order.u16([b[0], b[1]]))
    }

    fn u32_at(&self, offset: usize) -> RawResult<u32> {
        let b = self.bytes_at(offset, 4)?;
        Ok(self.order.u32([b[0], b[1], b[2], b[3]]))
    }

    fn read_ifd(&self, offset: u32) -> RawResult<(Ifd, u32)> {
        let base = offset as usize;
        let count = self.u16_at(base)?.min(MAX_ENTRIES);
        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let at = base + 2 + i * 12;
            let raw = self.bytes_at(at, 12)?;
            let tag = self.order.u16([raw[0], raw[1]]);
            let code = self.order.u16([raw[2], raw[3]]);
            let Some(field_type) = FieldType::from_code(code) else {
                trace!(tag, code, "skipping entry with unknown type");
                continue;
            };
            entries.push(Entry {
                tag,
                field_type,
                count: self.order.u32([raw[4], raw[5], raw[6], raw[7]]),
                field: [raw[8], raw[9], raw[10], raw[11]],
                field_offset: (at + 8) as u32,
            });
        }
        let next = self.u32_at(base + 2 + count as usize * 12).unwrap_or(0);
        Ok((Ifd { offset, entries }, next))
    }

    /// Payload bytes of an entry (inline when <= 4 bytes).
    pub fn payload(&self, entry: &Entry) -> RawResult<&'a [u8]> {
        let len = entry.byte_len();
        let offset = if len <= 4 {
            entry.field_offset
        } else {
            self.order.u32(entry.field)
        };
        self.bytes_at(offset as usize, len)
    }

    fn with_payload<T>(&self, entry: &Entry, f: impl FnOnce(&[u8]) -> T) -> RawResult<T> {
        Ok(f(self.payload(entry)?))
    }

    /// Integer values of an entry (BYTE/SHORT/LONG/IFD and signed variants).
    pub fn values_u32(&self, entry: &Entry) -> RawResult<Vec<u32>> {
        let order = self.order;
        let ty = entry.field_type;
        let size = ty.size();
        if !matches!(
            ty,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Long
                | FieldType::Ifd
                | FieldType::SByte
                | FieldType::SShort
                | FieldType::SLong
                | FieldType::Undefined
        ) {
            return Err(RawError::invalid_tag(entry.tag, format!("{:?} is not an integer type", ty)));
        }
        self.with_payload(entry, |bytes| {
            bytes
                .chunks_exact(size)
                .map(|c| match c.len() {
                    1 => c[0] as u32,
                    2 => order.u16([c[0], c[1]]) as u32,
                    _ => order.u32([c[0], c[1], c[2], c[3]]),
                })
                .collect()
        })
    }

    /// Rational values of an entry as `(numerator, denominator)`.
    pub fn rationals(&self, entry: &Entry) -> RawResult<Vec<(u32, u32)>> {
        if !matches!(entry.field_type, FieldType::Rational | FieldType::SRational) {
            return Err(RawError::invalid_tag(entry.tag, "not a rational"));
        }
        let order = self.order;
        self.with_payload(entry, |bytes| {
            bytes
                .chunks_exact(8)
                .map(|c| (order.u32([c[0], c[1], c[2], c[3]]), order.u32([c[4], c[5], c[6], c[7]])))
                .collect()
        })
    }

    /// First value of an entry as `f32`, whatever its numeric type.
    ///
    /// Rationals divide in floating point; a zero denominator yields `None`.
    pub fn number(&self, entry: &Entry) -> Option<f32> {
        match entry.field_type {
            FieldType::Rational | FieldType::SRational => {
                let (n, d) = *self.rationals(entry).ok()?.first()?;
                if d == 0 {
                    return None;
                }
                if entry.field_type == FieldType::SRational {
                    Some(n as i32 as f32 / d as i32 as f32)
                } else {
                    Some(n as f32 / d as f32)
                }
            }
            FieldType::Float => {
                let bits = self.values_raw32(entry)?;
                Some(f32::from_bits(bits))
            }
            FieldType::Double => {
                let b = self.payload(entry).ok()?;
                let arr: [u8; 8] = b.get(0..8)?.try_into().ok()?;
                Some(match self.order {
                    ByteOrder::LittleEndian => f64::from_le_bytes(arr),
                    ByteOrder::BigEndian => f64::from_be_bytes(arr),
                } as f32)
            }
            _ => self.values_u32(entry).ok()?.first().map(|&v| v as f32),
        }
    }

    /// Every value of an entry as `f32`.
    ///
    /// Rationals divide in floating point; a zero denominator yields `None`.
    pub fn numbers(&self, entry: &Entry) -> Option<Vec<f32>> {
        let order = self.order;
        match entry.field_type {
            FieldType::Rational => self
                .rationals(entry)
                .ok()?
                .into_iter()
                .map(|(n, d)| (d != 0).then(|| n as f32 / d as f32))
                .collect(),
            FieldType::SRational => self
                .rationals(entry)
                .ok()?
                .into_iter()
                .map(|(n, d)| (d != 0).then(|| n as i32 as f32 / d as i32 as f32))
                .collect(),
            FieldType::Float => self
                .with_payload(entry, |b| {
                    b.chunks_exact(4)
                        .map(|c| f32::from_bits(order.u32([c[0], c[1], c[2], c[3]])))
                        .collect::<Vec<f32>>()
                })
                .ok(),
            FieldType::Double => self
                .with_payload(entry, |b| {
                    b.chunks_exact(8)
                        .map(|c| {
                            let arr = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
                            match order {
                                ByteOrder::LittleEndian => f64::from_le_bytes(arr) as f32,
                                ByteOrder::BigEndian => f64::from_be_bytes(arr) as f32,
                            }
                        })
                        .collect::<Vec<f32>>()
                })
                .ok(),
            _ => Some(self.values_u32(entry).ok()?.into_iter().map(|v| v as f32).collect()),
        }
    }

    /// First value of an entry as an unsigned integer.
    ///
    /// Rationals use integer division and floats truncate; a zero
    /// denominator, a negative or a non-finite value yields `None`.
    pub fn integer(&self, entry: &Entry) -> Option<u32> {
        match entry.field_type {
            FieldType::Rational => {
                let (n, d) = *self.rationals(entry).ok()?.first()?;
                n.checked_div(d)
            }
            FieldType::SRational => {
                let (n, d) = *self.rationals(entry).ok()?.first()?;
                let q = (n as i32).checked_div(d as i32)?;
                u32::try_from(q).ok()
            }
            FieldType::Float | FieldType::Double => {
                let v = self.number(entry)?;
                (v.is_finite() && v >= 0.0).then(|| v as u32)
            }
            FieldType::SByte | FieldType::SShort | FieldType::SLong => {
                let v = *self.values_u32(entry).ok()?.first()?;
                let signed = match entry.field_type {
                    FieldType::SByte => v as u8 as i8 as i32,
                    FieldType::SShort => v as u16 as i16 as i32,
                    _ => v as i32,
                };
                u32::try_from(signed).ok()
            }
            _ => self.values_u32(entry).ok()?.first().copied(),
        }
    }

    fn values_raw32(&self, entry: &Entry) -> Option<u32> {
        let order = self.order;
        self.with_payload(entry, |b| b.get(0..4).map(|c| order.u32([c[0], c[1], c[2], c[3]])))
            .ok()
            .flatten()
    }

    /// ASCII value, trimmed at the first NUL and of trailing spaces.
    pub fn ascii(&self, entry: &Entry) -> Option<String> {
        if entry.field_type != FieldType::Ascii {
            return None;
        }
        self.with_payload(entry, |b| {
            let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
            String::from_utf8_lossy(&b[..end]).trim().to_string()
        })
        .ok()
        .filter(|s| !s.is_empty())
    }

    /// First integer value of `tag` in `ifd`.
    pub fn u32_tag(&self, ifd: &Ifd, tag: u16) -> Option<u32> {
        self.values_u32(ifd.get(tag)?).ok()?.first().copied()
    }

    /// Numeric value of `tag` in `ifd`.
    pub fn number_tag(&self, ifd: &Ifd, tag: u16) -> Option<f32> {
        self.number(ifd.get(tag)?)
    }

    /// First directory (main chain, SubIFDs, then EXIF) holding `tag`.
    pub fn find(&self, tag: u16) -> Option<(&Ifd, &Entry)> {
        self.ifds
            .iter()
            .chain(self.exif.iter())
            .find_map(|ifd| ifd.get(tag).map(|e| (ifd, e)))
    }

    /// ASCII value of `tag` from the first directory holding it.
    pub fn find_ascii(&self, tag: u16) -> Option<String> {
        self.find(tag).and_then(|(_, e)| self.ascii(e))
    }
}

//! Bayer strip location, unpacking and level normalization.
//!
//! Supported sample layouts:
//!
//! | bits | layout | bytes |
//! |------|--------|-------|
//! | 12/14 | packed, two samples in three bytes | `ceil(n/2) * 3` |
//! | 12/14 | one 16-bit word per sample | `n * 2` |
//! | 16 | one 16-bit word per sample | `n * 2` |
//!
//! Packed samples carry 12 significant bits; for 14-bit files they are
//! shifted up by two so levels stay in the 14-bit range.

use tracing::{debug, trace};

use crate::detect::ByteOrder;
use crate::error::{RawError, RawResult};
use crate::tiff::{Ifd, TiffFile, tags};

/// Black and white level in raw sample units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    /// Sensor black level
    pub black: u32,
    /// Sensor saturation
    pub white: u32,
}

impl Levels {
    /// Creates levels; a white level at or below black is widened to
    /// `black + 1` so normalization never divides by zero.
    pub fn new(black: u32, white: u32) -> Self {
        let black = black.min(u32::MAX - 1);
        Self {
            black,
            white: white.max(black + 1),
        }
    }

    /// `(v - black).max(0) / (white - black)`, clamped to [0, 1].
    #[inline]
    pub fn normalize(&self, v: u16) -> f32 {
        let range = (self.white - self.black) as f32;
        ((v as f32 - self.black as f32).max(0.0) / range).min(1.0)
    }
}

/// Storage of samples inside the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// 16-bit words
    Unpacked16,
    /// 12 bits per sample, big-endian bit order
    Packed12,
}

impl Packing {
    /// Bytes needed for `pixels` samples.
    pub fn bytes_for(self, pixels: usize) -> usize {
        match self {
            Self::Unpacked16 => pixels.saturating_mul(2),
            Self::Packed12 => pixels.div_ceil(2).saturating_mul(3),
        }
    }

    /// Picks a layout from the bytes available for `pixels` samples.
    ///
    /// # Errors
    ///
    /// [`RawError::Truncated`] when neither layout fits.
    pub fn detect(bits: u16, pixels: usize, available: usize) -> RawResult<Self> {
        if available >= Self::Unpacked16.bytes_for(pixels) {
            return Ok(Self::Unpacked16);
        }
        if bits < 16 && available >= Self::Packed12.bytes_for(pixels) {
            return Ok(Self::Packed12);
        }
        Err(RawError::Truncated {
            offset: 0,
            needed: Self::Packed12.bytes_for(pixels),
            len: available,
        })
    }
}

/// Strip table of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripTable {
    /// File offsets
    pub offsets: Vec<u32>,
    /// Byte counts; `None` when the tag is absent
    pub counts: Option<Vec<u32>>,
}

impl StripTable {
    /// Reads StripOffsets/StripByteCounts from `ifd`.
    ///
    /// Returns `None` when StripOffsets is missing or empty.
    pub fn locate(tiff: &TiffFile<'_>, ifd: &Ifd) -> Option<Self> {
        let offsets = tiff.values_u32(ifd.get(tags::STRIP_OFFSETS)?).ok()?;
        if offsets.is_empty() {
            return None;
        }
        let counts = ifd
            .get(tags::STRIP_BYTE_COUNTS)
            .and_then(|e| tiff.values_u32(e).ok())
            .filter(|c| c.len() == offsets.len());
        Some(Self { offsets, counts })
    }

    /// Concatenates every strip's bytes, keeping at most `limit` bytes.
    ///
    /// Every strip is bounds-checked against the file before anything is
    /// allocated. Without byte counts the single strip runs to the end of
    /// the file.
    pub fn gather(&self, tiff: &TiffFile<'_>, limit: usize) -> RawResult<Vec<u8>> {
        let data = tiff.data();
        match &self.counts {
            Some(counts) => {
                let strips = self
                    .offsets
                    .iter()
                    .zip(counts)
                    .map(|(&off, &cnt)| tiff.bytes_at(off as usize, cnt as usize))
                    .collect::<RawResult<Vec<&[u8]>>>()?;
                let total = strips.iter().fold(0usize, |acc, s| acc.saturating_add(s.len()));
                let mut out = Vec::with_capacity(total.min(limit));
                for strip in strips {
                    let room = limit - out.len();
                    if room == 0 {
                        break;
                    }
                    out.extend_from_slice(&strip[..strip.len().min(room)]);
                }
                Ok(out)
            }
            None => {
                let off = self.offsets[0] as usize;
                let rest = data.len().checked_sub(off).ok_or(RawError::Truncated {
                    offset: off,
                    needed: 1,
                    len: data.len(),
                })?;
                Ok(tiff.bytes_at(off, rest.min(limit))?.to_vec())
            }
        }
    }
}

/// Unpacks `pixels` samples from `bytes`.
pub fn unpack(bytes: &[u8], pixels: usize, packing: Packing, bits: u16, order: ByteOrder) -> RawResult<Vec<u16>> {
    let needed = packing.bytes_for(pixels);
    if bytes.len() < needed {
        return Err(RawError::Truncated {
            offset: 0,
            needed,
            len: bytes.len(),
        });
    }
    let mut out = Vec::with_capacity(pixels + 1);
    match packing {
        Packing::Unpacked16 => {
            out.extend(bytes[..needed].chunks_exact(2).map(|c| order.u16([c[0], c[1]])));
        }
        Packing::Packed12 => {
            let shift = bits.saturating_sub(12).min(4);
            for c in bytes[..needed].chunks_exact(3) {
                let a = ((c[0] as u16) << 4) | (c[1] as u16 >> 4);
                let b = (((c[1] & 0x0F) as u16) << 8) | c[2] as u16;
                out.push(a << shift);
                out.push(b << shift);
            }
            out.truncate(pixels);
        }
    }
    trace!(pixels, ?packing, "strip unpacked");
    Ok(out)
}

/// Applies black subtraction and white normalization to every sample.
pub fn normalize(raw: &[u16], levels: Levels) -> Vec<f32> {
    raw.iter().map(|&v| levels.normalize(v)).collect()
}

/// Reads the normalized Bayer plane of `ifd`.
///
/// # Errors
///
/// [`RawError::Unsupported`] for sample depths outside 10-16 bits,
/// [`RawError::MissingData`] when the directory has no strip table,
/// [`RawError::Truncated`] when the strips are shorter than the image.
pub fn read_bayer(
    tiff: &TiffFile<'_>,
    ifd: &Ifd,
    width: u32,
    height: u32,
    bits: u16,
    levels: Levels,
) -> RawResult<Vec<f32>> {
    if !(10..=16).contains(&bits) {
        return Err(RawError::Unsupported(format!("{} bits per sample", bits)));
    }
    let table = StripTable::locate(tiff, ifd)
        .ok_or_else(|| RawError::MissingData("StripOffsets".into()))?;
    let pixels = width as usize * height as usize;
    let bytes = table.gather(tiff, Packing::Unpacked16.bytes_for(pixels))?;
    let packing = Packing::detect(bits, pixels, bytes.len())?;
    debug!(
        width,
        height,
        bits,
        ?packing,
        strips = table.offsets.len(),
        black = levels.black,
        white = levels.white,
        "decoding Bayer strip"
    );
    let raw = unpack(&bytes, pixels, packing, bits, tiff.byte_order())?;
    Ok(normalize(&raw, levels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn levels_normalize() {
        let l = Levels::new(512, 16383);
        assert_eq!(l.normalize(0), 0.0);
        assert_eq!(l.normalize(512), 0.0);
        assert_eq!(l.normalize(16383), 1.0);
        assert_eq!(l.normalize(u16::MAX), 1.0);
        assert_abs_diff_eq!(l.normalize(8192), 7680.0 / 15871.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_levels() {
        let l = Levels::new(100, 50);
        assert_eq!(l.white, 101);
        assert_eq!(l.normalize(101), 1.0);
    }

    #[test]
    fn maximal_black_level_does_not_overflow() {
        let l = Levels::new(u32::MAX, 0);
        assert!(l.white > l.black);
        assert_eq!(l.normalize(u16::MAX), 0.0);
    }

    #[test]
    fn packing_detection() {
        assert_eq!(Packing::detect(14, 4, 8).unwrap(), Packing::Unpacked16);
        assert_eq!(Packing::detect(14, 4, 6).unwrap(), Packing::Packed12);
        assert!(Packing::detect(16, 4, 6).is_err());
        assert!(Packing::detect(14, 4, 5).is_err());
        assert_eq!(Packing::Packed12.bytes_for(3), 6);
    }

    #[test]
    fn unpack_packed_14bit() {
        let bytes = [0xAB, 0xC1, 0x23];
        let v = unpack(&bytes, 2, Packing::Packed12, 14, ByteOrder::LittleEndian).unwrap();
        assert_eq!(v, vec![0xABC << 2, 0x123 << 2]);
    }

    #[test]
    fn unpack_odd_count_packed() {
        let bytes = [0x10, 0x00, 0x00, 0x20, 0x00, 0x00];
        let v = unpack(&bytes, 3, Packing::Packed12, 12, ByteOrder::LittleEndian).unwrap();
        assert_eq!(v, vec![0x100, 0, 0x200]);
    }

    #[test]
    fn unpack_16bit_big_endian() {
        let bytes = [0x12, 0x34, 0xFF, 0xFF];
        let v = unpack(&bytes, 2, Packing::Unpacked16, 16, ByteOrder::BigEndian).unwrap();
        assert_eq!(v, vec![0x1234, 0xFFFF]);
    }

    #[test]
    fn unpack_truncated() {
        let err = unpack(&[0u8; 3], 2, Packing::Unpacked16, 14, ByteOrder::LittleEndian).unwrap_err();
        assert!(matches!(err, RawError::Truncated { needed: 4, .. }));
    }
}

//! Embedded JPEG preview extraction.
//!
//! Best-effort and independent of the main decode path:
//! 1. JPEGInterchangeFormat / JPEGInterchangeFormatLength in any directory
//! 2. otherwise a scan for SOI (`FF D8 FF`) ... EOI (`FF D9`) segments,
//!    keeping the largest

use tracing::{debug, trace};

use crate::error::{RawError, RawResult};
use crate::tiff::{TiffFile, tags};

const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Returns the embedded JPEG bytes, or `None` if none is found.
pub fn extract_preview(data: &[u8]) -> Option<&[u8]> {
    if let Ok(tiff) = TiffFile::parse(data) {
        if let Some(jpeg) = from_tags(&tiff) {
            debug!(bytes = jpeg.len(), "preview from JPEGInterchangeFormat");
            return Some(jpeg);
        }
    }
    let found = scan_markers(data);
    if let Some(jpeg) = found {
        debug!(bytes = jpeg.len(), "preview from SOI/EOI scan");
    }
    found
}

fn from_tags<'a>(tiff: &TiffFile<'a>) -> Option<&'a [u8]> {
    tiff.ifds
        .iter()
        .filter_map(|ifd| {
            let off = tiff.u32_tag(ifd, tags::JPEG_OFFSET)? as usize;
            let len = tiff.u32_tag(ifd, tags::JPEG_LENGTH)? as usize;
            let bytes = tiff.bytes_at(off, len).ok()?;
            bytes.starts_with(&SOI[..2]).then_some(bytes)
        })
        .max_by_key(|b| b.len())
}

/// Largest `SOI..=EOI` segment in `data`.
pub fn scan_markers(data: &[u8]) -> Option<&[u8]> {
    let mut best: Option<&[u8]> = None;
    let mut i = 0;
    while i + SOI.len() <= data.len() {
        if data[i..i + SOI.len()] != SOI {
            i += 1;
            continue;
        }
        let Some(end) = find(&data[i + 2..], &EOI).map(|p| i + 2 + p + EOI.len()) else {
            break;
        };
        let seg = &data[i..end];
        trace!(start = i, len = seg.len(), "JPEG segment");
        if best.is_none_or(|b| seg.len() > b.len()) {
            best = Some(seg);
        }
        i = end;
    }
    best
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

/// Decoded preview as RGBA8.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA bytes
    pub rgba: Vec<u8>,
}

/// Decodes a JPEG into RGBA8.
#[cfg(feature = "preview")]
pub fn decode_preview(jpeg: &[u8]) -> RawResult<PreviewImage> {
    use jpeg_decoder::{Decoder, PixelFormat};

    let mut decoder = Decoder::new(std::io::Cursor::new(jpeg));
    let pixels = decoder.decode().map_err(|e| RawError::Preview(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| RawError::Preview("missing frame info".into()))?;
    let n = info.width as usize * info.height as usize;
    let mut rgba = Vec::with_capacity(n * 4);
    match info.pixel_format {
        PixelFormat::RGB24 => {
            for px in pixels.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        PixelFormat::L8 => {
            for &v in &pixels {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelFormat::L16 => {
            for px in pixels.chunks_exact(2) {
                let v = px[0];
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelFormat::CMYK32 => {
            for px in pixels.chunks_exact(4) {
                let k = 255 - px[3] as u16;
                let inv = |c: u8| ((255 - c as u16) * k / 255) as u8;
                rgba.extend_from_slice(&[inv(px[0]), inv(px[1]), inv(px[2]), 255]);
            }
        }
    }
    if rgba.len() != n * 4 {
        return Err(RawError::Preview(format!(
            "decoded {} bytes for {}x{}",
            rgba.len(),
            info.width,
            info.height
        )));
    }
    Ok(PreviewImage {
        width: info.width as u32,
        height: info.height as u32,
        rgba,
    })
}

/// Decodes a JPEG into RGBA8 (requires the `preview` feature).
#[cfg(not(feature = "preview"))]
pub fn decode_preview(_jpeg: &[u8]) -> RawResult<PreviewImage> {
    Err(RawError::Preview("preview feature not enabled".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BayerTiffWriter;

    fn fake_jpeg(body: usize) -> Vec<u8> {
        let mut v = vec![0xFF, 0xD8, 0xFF, 0xE0];
        v.extend(std::iter::repeat_n(0x11, body));
        v.extend_from_slice(&EOI);
        v
    }

    #[test]
    fn scan_picks_largest() {
        let mut data = vec![0u8; 10];
        data.extend(fake_jpeg(4));
        data.extend([1, 2, 3]);
        data.extend(fake_jpeg(20));
        let seg = scan_markers(&data).unwrap();
        assert_eq!(seg.len(), 4 + 20 + 2);
    }

    #[test]
    fn scan_without_eoi() {
        let data = [0xFF, 0xD8, 0xFF, 0x00, 0x00];
        assert!(scan_markers(&data).is_none());
        assert!(scan_markers(&[]).is_none());
    }

    #[test]
    fn tags_take_priority() {
        let jpeg = fake_jpeg(8);
        let file = BayerTiffWriter::new(4, 4).preview(jpeg.clone()).build(&[0u16; 16]);
        assert_eq!(extract_preview(&file), Some(jpeg.as_slice()));
    }

    #[test]
    fn no_preview() {
        let file = BayerTiffWriter::new(4, 4).build(&[0u16; 16]);
        assert!(extract_preview(&file).is_none());
    }
}

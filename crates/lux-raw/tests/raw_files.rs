//! File-level RAW decoding tests.

use std::fs;
use std::path::PathBuf;

use lux_core::CfaPattern;
use lux_raw::{BayerTiffWriter, ByteOrder, DecodeOptions, RawError, RawReader, SampleLayout};
use tempfile::TempDir;

fn reader() -> RawReader {
    RawReader::with_options(DecodeOptions {
        refine: true,
        fallback_size: (60, 40),
        failure_size: (12, 12),
    })
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Baseline greyscale JPEG, 16x8: left block 200, right block 50.
#[cfg(feature = "preview")]
const GREY_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x08,
    0x00, 0x10, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00, 0x16, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x0B, 0xFF, 0xC4,
    0x00, 0x14, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0x64, 0x04,
    0xD3, 0xDF, 0xFF, 0xD9,
];

fn expected_14bit(v: f32) -> f32 {
    (v - 512.0) / (16383.0 - 512.0)
}

#[test]
fn uniform_14bit_dng_is_neutral() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(4, 4).model("Test DNG").build(&[8192u16; 16]);
    let path = write(&dir, "flat.dng", &bytes);

    let (img, meta) = reader().parse(&path).unwrap();
    assert!(!meta.synthetic);
    assert_eq!(meta.camera_model, "Test DNG");
    for y in 0..4 {
        for x in 0..4 {
            let [r, g, b] = img.pixel(x, y);
            assert!((r - expected_14bit(8192.0)).abs() < 1e-6);
            assert!((r - 0.483).abs() < 1e-3);
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }
}

#[test]
fn packed_and_unpacked_agree() {
    let dir = TempDir::new().unwrap();
    // multiples of 4 survive the 12-bit packing of 14-bit samples
    let samples: Vec<u16> = (0..64).map(|i| 600 + (i as u16 * 212) & !3).collect();
    let unpacked = BayerTiffWriter::new(8, 8).build(&samples);
    let packed = BayerTiffWriter::new(8, 8)
        .layout(SampleLayout::Packed12)
        .strips(3)
        .build(&samples);
    let a = reader().parse(write(&dir, "a.nef", &unpacked)).unwrap().0;
    let b = reader().parse(write(&dir, "b.nef", &packed)).unwrap().0;
    assert!(a.max_abs_diff(&b) < 1e-6);
}

#[test]
fn big_endian_16bit() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(6, 4)
        .bits(16)
        .byte_order(ByteOrder::BigEndian)
        .cfa([2, 1, 1, 0])
        .build(&[32768u16; 24]);
    assert_eq!(&bytes[..2], b"MM");
    let (img, meta) = reader().parse(write(&dir, "be.tif", &bytes)).unwrap();
    assert_eq!(meta.cfa_pattern, CfaPattern::BGGR);
    assert_eq!((meta.black_level, meta.white_level), (0, 65535));
    let v = 32768.0 / 65535.0;
    assert!((img.pixel(3, 2)[0] - v).abs() < 1e-6);
}

#[test]
fn exif_fields_are_read() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(2, 2)
        .make("NIKON")
        .model("Z 6")
        .iso(1600)
        .exposure(1, 250)
        .aperture(28, 10)
        .focal_length(50, 1)
        .build(&[0u16; 4]);
    let meta = lux_raw::read_metadata(write(&dir, "exif.nef", &bytes)).unwrap();
    assert_eq!(meta.camera_model, "NIKON Z 6");
    assert_eq!(meta.iso, 1600);
    assert!((meta.exposure_time - 0.004).abs() < 1e-6);
    assert!((meta.aperture - 2.8).abs() < 1e-6);
    assert_eq!(meta.focal_length, 50.0);
    assert_eq!(meta.shutter_speed(), "1/250 s");
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = reader().parse(dir.path().join("nope.dng")).unwrap_err();
    assert!(matches!(err, RawError::Io(_)));
}

#[test]
fn unrecognized_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "notes.txt", b"hello world, definitely not a raw file");
    let err = reader().parse(&path).unwrap_err();
    assert!(matches!(err, RawError::InvalidHeader(_)));
}

#[test]
fn proprietary_container_gets_placeholder() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "DSCF0001.RAF", b"FUJIFILMCCD-RAW 0201FF383501");
    let (img, meta) = reader().parse(&path).unwrap();
    assert!(meta.synthetic);
    assert_eq!(img.dimensions(), (60, 40));
    // deterministic gradient
    let again = reader().parse(&path).unwrap().0;
    assert_eq!(img, again);
}

#[test]
fn missing_strips_gets_default_placeholder() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(16, 16).omit_strips().build(&[]);
    let (img, meta) = reader().parse(write(&dir, "empty.dng", &bytes)).unwrap();
    assert!(meta.synthetic);
    assert_eq!(img.dimensions(), (60, 40));
}

#[test]
fn truncated_strip_gets_failure_placeholder() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(16, 16).truncate(100).build(&[4000u16; 256]);
    let (img, meta) = reader().parse(write(&dir, "cut.dng", &bytes)).unwrap();
    assert!(meta.synthetic);
    assert_eq!(img.dimensions(), (12, 12));
}

#[test]
fn default_placeholder_sizes() {
    let opts = DecodeOptions::default();
    assert_eq!(opts.fallback_size, (6000, 4000));
    assert_eq!(opts.failure_size, (1200, 1200));
    assert!(opts.refine);
}

#[test]
fn preview_is_found_but_garbage_fails_to_decode() {
    let dir = TempDir::new().unwrap();
    let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02, 0xFF, 0xD9];
    let bytes = BayerTiffWriter::new(4, 4).preview(jpeg.clone()).build(&[0u16; 16]);
    assert_eq!(lux_raw::extract_preview(&bytes), Some(jpeg.as_slice()));
    let path = write(&dir, "prev.dng", &bytes);
    assert!(lux_raw::read_preview(&path).is_err());

    let plain = write(&dir, "plain.dng", &BayerTiffWriter::new(4, 4).build(&[0u16; 16]));
    assert!(lux_raw::read_preview(&plain).unwrap().is_none());
}

#[test]
fn oversized_black_level_uses_bit_depth_defaults() {
    let bytes = BayerTiffWriter::new(4, 4).levels(u32::MAX, 20000).build(&[8192u16; 16]);
    let (img, meta) = reader().parse_bytes(&bytes, None).unwrap();
    assert!(!meta.synthetic);
    assert_eq!((meta.black_level, meta.white_level), (512, 16383));
    assert!((img.pixel(1, 1)[0] - expected_14bit(8192.0)).abs() < 1e-6);
}

#[test]
fn rational_levels_truncate() {
    let bytes = BayerTiffWriter::new(2, 2)
        .bits(16)
        .rational_levels((2001, 2), (122001, 2))
        .build(&[31000u16; 4]);
    let meta = lux_raw::metadata_from_bytes(&bytes, None).unwrap();
    assert_eq!((meta.black_level, meta.white_level), (1000, 61000));
}

#[test]
fn oversized_strip_counts_get_failure_placeholder() {
    let bytes = BayerTiffWriter::new(4, 4)
        .strips(4)
        .strip_byte_count(u32::MAX)
        .build(&[4000u16; 16]);
    let (img, meta) = reader().parse_bytes(&bytes, None).unwrap();
    assert!(meta.synthetic);
    assert_eq!(img.dimensions(), (12, 12));
}

#[test]
fn strip_count_past_image_is_capped() {
    let samples: Vec<u16> = (0..16).map(|i| 1000 + i * 100).collect();
    let exact = BayerTiffWriter::new(4, 4).build(&samples);
    let mut padded = BayerTiffWriter::new(4, 4).strip_byte_count(32 + 64).build(&samples);
    padded.extend_from_slice(&[0u8; 64]);
    let a = reader().parse_bytes(&exact, None).unwrap();
    let b = reader().parse_bytes(&padded, None).unwrap();
    assert!(!b.1.synthetic);
    assert_eq!(a.0, b.0);
}

#[test]
fn as_shot_white_xy_sets_white_balance() {
    let bytes = BayerTiffWriter::new(2, 2)
        .as_shot_white_xy((3457, 10000), (3585, 10000))
        .build(&[0u16; 4]);
    let meta = lux_raw::metadata_from_bytes(&bytes, None).unwrap();
    assert!((meta.white_balance.temperature - 5001.0).abs() < 10.0);
    assert!(meta.white_balance.tint.abs() < 0.2);
}

#[test]
fn as_shot_neutral_sets_white_balance() {
    let bytes = BayerTiffWriter::new(2, 2)
        .byte_order(ByteOrder::BigEndian)
        .as_shot_neutral([(1, 1), (4, 5), (1, 2)])
        .build(&[0u16; 4]);
    let meta = lux_raw::metadata_from_bytes(&bytes, None).unwrap();
    assert!(meta.white_balance.temperature < 5000.0);

    let plain = lux_raw::metadata_from_bytes(&BayerTiffWriter::new(2, 2).build(&[0u16; 4]), None).unwrap();
    assert_eq!(plain.white_balance.temperature, 5500.0);
    assert_eq!(plain.white_balance.tint, 0.0);
}

#[test]
fn zero_dimensions_get_full_size_placeholder() {
    let bytes = BayerTiffWriter::new(0, 0).model("Empty").build(&[]);
    let (img, meta) = RawReader::new().parse_bytes(&bytes, None).unwrap();
    assert!(meta.synthetic);
    assert_eq!(meta.camera_model, "Empty");
    assert_eq!(img.dimensions(), (6000, 4000));
}

#[cfg(feature = "preview")]
fn assert_grey_preview(preview: &lux_raw::PreviewImage) {
    assert_eq!((preview.width, preview.height), (16, 8));
    assert_eq!(preview.rgba.len(), 16 * 8 * 4);
    let at = |x: usize, y: usize| &preview.rgba[(y * 16 + x) * 4..(y * 16 + x) * 4 + 4];
    for y in 0..8 {
        for x in 0..16 {
            let px = at(x, y);
            let want = if x < 8 { 200 } else { 50 };
            assert!((px[0] as i32 - want).abs() <= 1, "({}, {}) = {:?}", x, y, px);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }
    }
}

#[cfg(feature = "preview")]
#[test]
fn preview_from_tags_decodes() {
    let dir = TempDir::new().unwrap();
    let bytes = BayerTiffWriter::new(4, 4).preview(GREY_JPEG.to_vec()).build(&[0u16; 16]);
    assert_eq!(lux_raw::extract_preview(&bytes), Some(GREY_JPEG));
    let path = write(&dir, "tagged.dng", &bytes);
    let preview = lux_raw::read_preview(&path).unwrap().unwrap();
    assert_grey_preview(&preview);
}

#[cfg(feature = "preview")]
#[test]
fn preview_from_marker_scan_decodes() {
    let mut bytes = BayerTiffWriter::new(4, 4).build(&[0u16; 16]);
    bytes.extend_from_slice(GREY_JPEG);
    bytes.extend_from_slice(&[0u8; 7]);
    assert_eq!(lux_raw::extract_preview(&bytes), Some(GREY_JPEG));
    let preview = lux_raw::decode_preview(lux_raw::extract_preview(&bytes).unwrap()).unwrap();
    assert_grey_preview(&preview);
}

//! File-to-display developments.

use std::fs;
use std::sync::Arc;

use lux_filter::{FilterConfig, FilterEngine, NullGpu};
use lux_pipeline::{ParameterSet, Pipeline, PipelineError, Stage};
use lux_raw::{BayerTiffWriter, DecodeOptions};
use tempfile::TempDir;

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .engine(Arc::new(FilterEngine::with_gpu(FilterConfig::default(), Box::new(NullGpu))))
        .workers(2)
        .decode_options(DecodeOptions {
            fallback_size: (32, 24),
            failure_size: (8, 8),
            ..Default::default()
        })
        .build()
        .unwrap()
}

#[test]
fn develops_bayer_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grey.dng");
    let samples = vec![8192u16; 8 * 6];
    fs::write(&path, BayerTiffWriter::new(8, 6).iso(1600).build(&samples)).unwrap();

    let p = pipeline();
    let meta = lux_raw::read_metadata(&path).unwrap();
    let params = ParameterSet::from_metadata(&meta);
    assert!(params.noise_reduction > 0.0);

    let dev = p.develop_file(&path, &params).unwrap();
    assert_eq!((dev.image.width(), dev.image.height()), (8, 6));
    assert_eq!(dev.metadata.iso, 1600);
    assert_eq!(dev.timings.stages().first(), Some(&Stage::Decode));
    assert_eq!(dev.timings.stages().last(), Some(&Stage::Display));

    // a flat grey stays grey
    let px = dev.image.pixel(4, 3);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
    assert_eq!(px[3], 255);
}

#[test]
fn neutral_develop_is_plain_display() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flat.nef");
    fs::write(&path, BayerTiffWriter::new(4, 4).build(&[8192u16; 16])).unwrap();

    let dev = pipeline().develop_file(&path, &ParameterSet::default()).unwrap();
    // 0.4839 linear encodes to 185
    assert_eq!(dev.image.pixel(1, 1), [185, 185, 185, 255]);
    assert_eq!(dev.timings.stages(), vec![Stage::Decode, Stage::Display]);
}

#[test]
fn missing_file_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let err = pipeline()
        .develop_file(dir.path().join("absent.dng"), &ParameterSet::default())
        .unwrap_err();
    assert!(err.is_decode_error());
}

#[test]
fn unrecognized_container_fails_but_whitelisted_falls_back() {
    let dir = TempDir::new().unwrap();
    let junk = dir.path().join("notes.txt");
    fs::write(&junk, b"hello world, not a raw file").unwrap();
    let err = pipeline().develop_file(&junk, &ParameterSet::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Raw(_)));

    let cr3 = dir.path().join("shot.cr3");
    fs::write(&cr3, b"\0\0\0\x18ftypcrx ").unwrap();
    let dev = pipeline().develop_file(&cr3, &ParameterSet::default()).unwrap();
    assert!(dev.metadata.synthetic);
    assert_eq!((dev.image.width(), dev.image.height()), (32, 24));
}

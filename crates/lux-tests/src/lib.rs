//! End-to-end tests for lux crates.
//!
//! These exercise the full path from a RAW container on disk through the
//! kernels and filter engine to the display buffer.

pub mod fixtures;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use approx::assert_abs_diff_eq;
    use lux_core::{CfaPattern, LinearImage, WorkerPool};
    use lux_filter::{FilterConfig, FilterEngine, NullGpu};
    use lux_ops::display::{DisplayOptions, display_to_linear, linear_to_display, output_to_linear};
    use lux_ops::{temperature, tone_regions};
    use lux_pipeline::{ParameterSet, Pipeline, Stage};
    use lux_raw::{BayerTiffWriter, DecodeOptions, RawReader};
    use tempfile::tempdir;

    use crate::fixtures::*;

    fn engine(config: FilterConfig) -> Arc<FilterEngine> {
        Arc::new(FilterEngine::with_gpu(config, Box::new(NullGpu)))
    }

    fn pipeline(workers: usize) -> Pipeline {
        Pipeline::builder()
            .engine(engine(FilterConfig::default()))
            .workers(workers)
            .decode_options(DecodeOptions {
                fallback_size: (48, 32),
                failure_size: (16, 16),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    /// 4x4 Bayer of 8192 with levels 512/16383 decodes to uniform grey.
    #[test]
    fn flat_bayer_decodes_to_grey() {
        let dir = tempdir().unwrap();
        let bytes = BayerTiffWriter::new(4, 4)
            .levels(LEVELS_14.0, LEVELS_14.1)
            .build(&flat_bayer(4, 4, 8192));
        let path = write_fixture(dir.path(), "flat.dng", &bytes).unwrap();

        let (img, meta) = lux_raw::parse(&path).unwrap();
        assert_eq!((meta.black_level, meta.white_level), LEVELS_14);
        assert_eq!(img.dimensions(), (4, 4));
        let expected = (8192.0 - 512.0) / (16383.0 - 512.0);
        for i in 0..img.pixel_count() {
            for v in img.pixel_at(i) {
                assert_abs_diff_eq!(v, expected, epsilon = 1e-6);
                assert_abs_diff_eq!(v, 0.483, epsilon = 1e-3);
            }
        }
    }

    /// +1 EV on 0.5 grey reaches 1.0 and white on display.
    #[test]
    fn exposure_plus_one_reaches_white() {
        let p = pipeline(2);
        let mut img = LinearImage::filled(8, 8, [0.5; 3]);
        let params = ParameterSet {
            exposure: 1.0,
            ..Default::default()
        };
        p.process(&mut img, &params);
        for v in img.pixel(3, 3) {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-6);
        }
        let out = linear_to_display(&img, &DisplayOptions::default(), p.pool());
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
    }

    /// Zero spatial sigma is a copy on every path.
    #[test]
    fn zero_spatial_sigma_is_identity() {
        let e = engine(FilterConfig::default());
        let src = scene_image(40, 30);
        assert_eq!(e.apply_cached(&src, 0.0, 0.1), src);
        assert_eq!(e.apply(&src, 0.0, 0.1), src);
        assert_eq!(e.apply_reference(&src, 0.0, 0.1), src);
        assert_eq!(e.apply_fast(&src, 0.0, 0.1), src);
        assert_eq!(e.stats().misses, 0);
    }

    /// Neutral white balance returns before touching pixels.
    #[test]
    fn neutral_temperature_is_identity() {
        let src = scene_image(33, 21);
        let mut img = src.clone();
        temperature::apply_temperature(&mut img, 0.0, 0.0, WorkerPool::global());
        assert_eq!(img, src);
        assert!(temperature::white_balance_gains(0.0, 0.0).is_none());
    }

    #[test]
    fn identical_cached_calls_hit() {
        let e = engine(FilterConfig::default());
        let src = scene_image(64, 48);
        let a = e.apply_cached(&src, 2.0, 0.1);
        let b = e.apply_cached(&src.clone(), 2.0, 0.1);
        assert_eq!(a, b);
        let stats = e.stats();
        assert_eq!((stats.misses, stats.hits), (1, 1));
        assert_eq!(stats.cached_entries, 1);
    }

    #[test]
    fn eviction_is_least_recently_used() {
        let e = engine(FilterConfig {
            max_cache_entries: 2,
            ..Default::default()
        });
        let src = scene_image(24, 24);
        e.apply_cached(&src, 1.0, 0.1);
        e.apply_cached(&src, 1.5, 0.1);
        // touch 1.0 so 1.5 becomes the oldest
        e.apply_cached(&src, 1.0, 0.1);
        e.apply_cached(&src, 2.0, 0.1);
        let stats = e.stats();
        assert_eq!(stats.cached_entries, 2);
        assert_eq!(stats.evictions, 1);

        e.reset_stats();
        e.apply_cached(&src, 1.0, 0.1);
        e.apply_cached(&src, 2.0, 0.1);
        assert_eq!(e.stats().hits, 2);
        e.apply_cached(&src, 1.5, 0.1);
        assert_eq!(e.stats().misses, 1);
        assert!(e.stats().cached_entries <= 2);
    }

    #[test]
    fn demosaic_shape_and_range() {
        let (w, h) = (37u32, 23u32);
        let bayer: Vec<f32> = scene_bayer(w, h, 3)
            .iter()
            .map(|&v| (v as f32 - 512.0) / (16383.0 - 512.0))
            .collect();
        let img = lux_raw::demosaic(&bayer, w, h, CfaPattern::RGGB).unwrap();
        assert_eq!(img.dimensions(), (w, h));
        for i in 0..img.pixel_count() {
            for v in img.pixel_at(i) {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn tone_windows_are_bounded_and_monotonic() {
        let mut prev = tone_regions::window_weights(0.0);
        for i in 1..=1000 {
            let l = i as f32 * 0.1;
            let w = tone_regions::window_weights(l);
            for k in 0..4 {
                assert!((0.0..=1.0).contains(&w[k]));
            }
            // highlights and whites rise, shadows and blacks fall
            assert!(w[0] >= prev[0] && w[2] >= prev[2]);
            assert!(w[1] <= prev[1] && w[3] <= prev[3]);
            prev = w;
        }
    }

    #[test]
    fn display_round_trip_after_develop() {
        let dir = tempdir().unwrap();
        let (w, h) = (32, 24);
        let path = write_fixture(dir.path(), "scene.dng", &bayer_tiff(w, h, &scene_bayer(w, h, 1))).unwrap();
        let p = pipeline(2);
        let (linear, _) = p.decode(&path).unwrap();
        let out = p.render(&linear, &ParameterSet::default());
        let back = output_to_linear(&out).unwrap();
        for i in 0..linear.pixel_count() {
            let a = linear.pixel_at(i);
            let b = back.pixel_at(i);
            for c in 0..3 {
                let ea = lux_transfer::srgb::oetf(a[c].clamp(0.0, 1.0)) * 255.0;
                let eb = lux_transfer::srgb::oetf(b[c]) * 255.0;
                assert!((ea - eb).abs() <= 0.501);
            }
        }
    }

    #[test]
    fn full_develop_is_deterministic_across_workers() {
        let dir = tempdir().unwrap();
        let (w, h) = (40, 30);
        let path = write_fixture(dir.path(), "scene.nef", &bayer_tiff(w, h, &scene_bayer(w, h, 9))).unwrap();
        let params = ParameterSet {
            exposure: 0.4,
            contrast: 1.2,
            temperature: 0.2,
            shadows: 0.3,
            highlights: -0.4,
            vibrance: 0.3,
            clarity: 0.4,
            texture: 0.2,
            noise_reduction: 0.3,
            sharpening: 0.5,
            dehaze: 0.2,
            vignette: -0.3,
            grain: 0.1,
            grain_seed: 1234,
            display: DisplayOptions {
                soft_clip: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let a = pipeline(1).develop_file(&path, &params).unwrap();
        let b = pipeline(4).develop_file(&path, &params).unwrap();
        assert_eq!(output_hash(&a.image), output_hash(&b.image));
        assert_eq!(a.metadata.camera_model, "lux Synthetic Sensor");
        assert_eq!(a.timings.stages().len(), Stage::KERNELS.len() + 2);
    }

    #[test]
    fn missing_strips_fall_back_to_placeholder() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), "nostrip.dng", &BayerTiffWriter::new(16, 16).omit_strips().build(&[]))
            .unwrap();
        let dev = pipeline(2).develop_file(&path, &ParameterSet::default()).unwrap();
        assert!(dev.metadata.synthetic);
        assert_eq!((dev.image.width(), dev.image.height()), (48, 32));
    }

    #[test]
    fn truncated_strip_falls_back_to_failure_placeholder() {
        let dir = tempdir().unwrap();
        let bytes = BayerTiffWriter::new(16, 16).truncate(100).build(&flat_bayer(16, 16, 4000));
        let path = write_fixture(dir.path(), "short.dng", &bytes).unwrap();
        let reader = RawReader::with_options(DecodeOptions {
            fallback_size: (48, 32),
            failure_size: (12, 12),
            ..Default::default()
        });
        let (img, meta) = reader.parse(&path).unwrap();
        assert!(meta.synthetic);
        assert_eq!(img.dimensions(), (12, 12));
    }

    #[test]
    fn concurrent_pipelines_share_one_cache() {
        let shared = engine(FilterConfig::default());
        let src = Arc::new(scene_image(48, 36));
        let params = ParameterSet {
            clarity: 0.5,
            ..Default::default()
        };
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let e = Arc::clone(&shared);
                let src = Arc::clone(&src);
                let params = params.clone();
                thread::spawn(move || {
                    let p = Pipeline::builder().engine(e).workers(2).build().unwrap();
                    p.render(&src, &params)
                })
            })
            .collect();
        let outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        let stats = shared.stats();
        assert_eq!(stats.hits + stats.misses, 3);
        assert_eq!(stats.cached_entries, 1);
    }

    #[test]
    fn preset_file_drives_develop() {
        let dir = tempdir().unwrap();
        let (w, h) = (16, 12);
        let path = write_fixture(dir.path(), "a.dng", &bayer_tiff(w, h, &flat_bayer(w, h, 6000))).unwrap();
        let preset = dir.path().join("look.yaml");
        std::fs::write(&preset, "exposure: -1.0\nsaturation: -1.0\n").unwrap();
        let params = ParameterSet::load(&preset).unwrap();

        let p = pipeline(2);
        let dark = p.develop_file(&path, &params).unwrap();
        let plain = p.develop_file(&path, &ParameterSet::default()).unwrap();
        assert!(dark.image.pixel(5, 5)[1] < plain.image.pixel(5, 5)[1]);
    }

    #[test]
    fn embedded_preview_linearizes() {
        let dir = tempdir().unwrap();
        let bytes = BayerTiffWriter::new(8, 8)
            .preview(GREY_JPEG.to_vec())
            .build(&flat_bayer(8, 8, 4000));
        let path = write_fixture(dir.path(), "preview.dng", &bytes).unwrap();

        let preview = lux_raw::read_preview(&path).unwrap().unwrap();
        assert_eq!((preview.width, preview.height), (16, 8));
        let linear = display_to_linear(&preview.rgba, preview.width, preview.height).unwrap();
        assert_eq!(linear.dimensions(), (16, 8));
        let bright = lux_transfer::srgb::eotf(200.0 / 255.0);
        let dark = lux_transfer::srgb::eotf(50.0 / 255.0);
        for y in 0..8 {
            assert_abs_diff_eq!(linear.pixel(3, y)[0], bright, epsilon = 0.01);
            assert_abs_diff_eq!(linear.pixel(12, y)[2], dark, epsilon = 0.01);
        }
    }

    #[test]
    fn as_shot_white_balance_seeds_parameters() {
        let dir = tempdir().unwrap();
        let bytes = BayerTiffWriter::new(8, 8)
            .as_shot_white_xy((3457, 10000), (3585, 10000))
            .build(&flat_bayer(8, 8, 4000));
        let path = write_fixture(dir.path(), "d50.dng", &bytes).unwrap();

        let meta = lux_raw::read_metadata(&path).unwrap();
        let params = ParameterSet::from_metadata(&meta);
        assert_abs_diff_eq!(params.temperature, (5001.0 - 5500.0) / 3500.0, epsilon = 0.005);
        assert!(params.tint.abs() < 0.2);
    }
}

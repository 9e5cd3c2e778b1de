//! Engine-level tests: selection, GPU fallback, caching across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lux_core::LinearImage;
use lux_filter::{FilterBackend, FilterConfig, FilterEngine, FilterError, FilterResult, GpuDevice};

/// Device that initializes but fails every run.
#[derive(Default)]
struct BrokenGpu {
    calls: AtomicUsize,
}

impl GpuDevice for BrokenGpu {
    fn name(&self) -> &str {
        "broken"
    }

    fn initialize(&self) -> FilterResult<()> {
        Ok(())
    }

    fn bilateral(&self, _input: &LinearImage, _s: f32, _r: f32) -> FilterResult<LinearImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FilterError::OperationFailed("device lost".into()))
    }
}

/// Device that "filters" by returning the input.
struct EchoGpu;

impl GpuDevice for EchoGpu {
    fn name(&self) -> &str {
        "echo"
    }

    fn initialize(&self) -> FilterResult<()> {
        Ok(())
    }

    fn bilateral(&self, input: &LinearImage, _s: f32, _r: f32) -> FilterResult<LinearImage> {
        Ok(input.clone())
    }
}

fn gpu_config() -> FilterConfig {
    FilterConfig {
        gpu_pixel_threshold: 100_000,
        ..FilterConfig::default()
    }
}

fn big_image() -> LinearImage {
    // 400 x 250 = 100000 pixels, exactly at the threshold
    LinearImage::from_fn(400, 250, |x, y| {
        let v = ((x / 10 + y / 10) % 2) as f32 * 0.5 + 0.1;
        [v, v, v]
    })
}

#[test]
fn gpu_selected_for_large_images() {
    let engine = FilterEngine::with_gpu(gpu_config(), Box::new(EchoGpu));
    let img = big_image();
    assert_eq!(engine.select_backend(&img, 1.0), FilterBackend::Gpu);
    let small = LinearImage::new(10, 10);
    assert_eq!(engine.select_backend(&small, 1.0), FilterBackend::Reference);

    let out = engine.apply(&img, 1.0, 0.1);
    assert_eq!(out, img);
    assert_eq!(engine.stats().gpu_runs, 1);
}

#[test]
fn gpu_failure_falls_back_to_cpu() {
    let gpu = Box::new(BrokenGpu::default());
    let engine = FilterEngine::with_gpu(gpu_config(), gpu);
    let img = big_image();

    let out = engine.apply(&img, 1.0, 0.1);
    let expected = engine.apply_reference(&img, 1.0, 0.1);
    assert_eq!(out, expected);

    let s = engine.stats();
    assert_eq!(s.gpu_fallbacks, 1);
    assert_eq!(s.gpu_runs, 0);
    assert_eq!(s.reference_runs, 2);
}

#[test]
fn gpu_failure_falls_back_to_fast_for_large_sigma() {
    let engine = FilterEngine::with_gpu(gpu_config(), Box::new(BrokenGpu::default()));
    let img = big_image();
    let out = engine.apply(&img, 5.0, 0.1);
    assert_eq!(out, engine.apply_fast(&img, 5.0, 0.1));
    let s = engine.stats();
    assert_eq!(s.gpu_fallbacks, 1);
    assert_eq!(s.fast_runs, 2);
}

#[test]
fn gpu_disabled_is_never_called() {
    let engine = FilterEngine::with_gpu(
        FilterConfig {
            gpu_enabled: false,
            ..gpu_config()
        },
        Box::new(BrokenGpu::default()),
    );
    let img = big_image();
    assert_eq!(engine.select_backend(&img, 1.0), FilterBackend::Reference);
    assert!(engine.apply_with(FilterBackend::Gpu, &img, 1.0, 0.1).is_err());
}

#[test]
fn shared_cache_across_threads() {
    let engine = Arc::new(FilterEngine::with_gpu(FilterConfig::default(), Box::new(lux_filter::NullGpu)));
    let img = Arc::new(LinearImage::from_fn(24, 24, |x, y| [x as f32 / 24.0, y as f32 / 24.0, 0.3]));
    let first = engine.apply_cached(&img, 1.0, 0.1);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let img = Arc::clone(&img);
            std::thread::spawn(move || engine.apply_cached(&img, 1.0, 0.1))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), first);
    }
    let s = engine.stats();
    assert_eq!(s.misses, 1);
    assert_eq!(s.hits, 4);
}

#[test]
fn sigma_within_tolerance_hits() {
    let engine = FilterEngine::with_gpu(FilterConfig::default(), Box::new(lux_filter::NullGpu));
    let img = LinearImage::filled(8, 8, [0.4; 3]);
    engine.apply_cached(&img, 2.0, 0.1);
    engine.apply_cached(&img, 2.0004, 0.1);
    engine.apply_cached(&img, 2.5, 0.1);
    let s = engine.stats();
    assert_eq!((s.hits, s.misses), (1, 2));
}

#[test]
fn invalid_config_is_sanitized() {
    let engine = FilterEngine::with_gpu(
        FilterConfig {
            fast_sigma_threshold: -1.0,
            max_cache_memory_mb: 0,
            ..FilterConfig::default()
        },
        Box::new(lux_filter::NullGpu),
    );
    let cfg = engine.config();
    assert_eq!(cfg.fast_sigma_threshold, 4.5);
    assert_eq!(cfg.max_cache_memory_mb, 512);
}

#[test]
fn config_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filter.yaml");
    std::fs::write(&path, "fast_enabled: false\nfast_sigma_threshold: 8.0\n").unwrap();
    let cfg = FilterConfig::load(&path).unwrap();
    assert!(!cfg.fast_enabled);
    assert_eq!(cfg.fast_sigma_threshold, 8.0);
    assert!(matches!(FilterConfig::load(dir.path().join("missing.yaml")), Err(FilterError::Io(_))));
}

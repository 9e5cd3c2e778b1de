//! The filter engine: backend selection, GPU fallback and result caching.
//!
//! # Selection
//!
//! 1. GPU, if enabled, the image has at least `gpu_pixel_threshold` pixels
//!    and the device initializes
//! 2. fast, if enabled and `sigma_s >= fast_sigma_threshold`
//! 3. reference
//!
//! A GPU error at run time is logged and the same call continues on the
//! CPU path step 2/3 would pick. No filtering call returns an error.
//!
//! # Sharing
//!
//! An engine owns its config, cache and statistics. Wrap it in an `Arc` to
//! share it across pipelines, or use [`FilterEngine::shared`] for the
//! process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use lux_core::{LinearImage, WorkerPool};
use tracing::{debug, trace, warn};

use crate::backend::{self, BackendInfo, FilterBackend, GpuDevice, fast, reference};
use crate::cache::FilterCache;
use crate::config::FilterConfig;
use crate::error::{FilterError, FilterResult};
use crate::hash::HashKey;

static SHARED: OnceLock<Arc<FilterEngine>> = OnceLock::new();

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
    reference_runs: AtomicU64,
    fast_runs: AtomicU64,
    gpu_runs: AtomicU64,
    gpu_fallbacks: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Snapshot of engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Cached calls answered from the cache
    pub hits: u64,
    /// Cached calls that had to compute
    pub misses: u64,
    /// Entries evicted by inserts or lowered limits
    pub evictions: u64,
    /// Entries stored
    pub inserts: u64,
    /// Reference backend runs
    pub reference_runs: u64,
    /// Fast backend runs
    pub fast_runs: u64,
    /// Successful GPU runs
    pub gpu_runs: u64,
    /// GPU runs that failed and fell back to the CPU
    pub gpu_fallbacks: u64,
    /// Entries currently cached
    pub cached_entries: usize,
    /// Bytes currently cached
    pub cached_bytes: usize,
}

impl FilterStats {
    /// `hits / (hits + misses)`, or 0 before any cached call.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// Bilateral filter engine.
pub struct FilterEngine {
    config: RwLock<FilterConfig>,
    cache: Mutex<FilterCache>,
    counters: Counters,
    gpu: Box<dyn GpuDevice>,
}

impl FilterEngine {
    /// Engine with the platform default GPU device.
    pub fn new(config: FilterConfig) -> Self {
        Self::with_gpu(config, backend::default_gpu())
    }

    /// Engine with an explicit GPU device.
    pub fn with_gpu(config: FilterConfig, gpu: Box<dyn GpuDevice>) -> Self {
        let config = config.sanitized();
        let cache = FilterCache::new(config.max_cache_entries, config.max_cache_bytes());
        Self {
            config: RwLock::new(config),
            cache: Mutex::new(cache),
            counters: Counters::default(),
            gpu,
        }
    }

    /// Process-wide engine configured from `LUX_FILTER_*` variables.
    pub fn shared() -> Arc<FilterEngine> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(FilterEngine::new(FilterConfig::from_env()))))
    }

    fn lock_cache(&self) -> MutexGuard<'_, FilterCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current configuration.
    pub fn config(&self) -> FilterConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the configuration. Out-of-range fields are reset to
    /// defaults; the cache is trimmed to the new limits.
    pub fn set_config(&self, config: FilterConfig) {
        let config = config.sanitized();
        let evicted = self
            .lock_cache()
            .set_limits(config.max_cache_entries, config.max_cache_bytes());
        Counters::bump(&self.counters.evictions, evicted as u64);
        debug!(?config, evicted, "filter config updated");
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Drops every cached result.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> FilterStats {
        let c = &self.counters;
        let (cached_entries, cached_bytes) = {
            let cache = self.lock_cache();
            (cache.len(), cache.bytes())
        };
        FilterStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            inserts: c.inserts.load(Ordering::Relaxed),
            reference_runs: c.reference_runs.load(Ordering::Relaxed),
            fast_runs: c.fast_runs.load(Ordering::Relaxed),
            gpu_runs: c.gpu_runs.load(Ordering::Relaxed),
            gpu_fallbacks: c.gpu_fallbacks.load(Ordering::Relaxed),
            cached_entries,
            cached_bytes,
        }
    }

    /// Zeroes the counters; cached entries are kept.
    pub fn reset_stats(&self) {
        let c = &self.counters;
        for counter in [
            &c.hits,
            &c.misses,
            &c.evictions,
            &c.inserts,
            &c.reference_runs,
            &c.fast_runs,
            &c.gpu_runs,
            &c.gpu_fallbacks,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// The engine's GPU device.
    pub fn gpu(&self) -> &dyn GpuDevice {
        self.gpu.as_ref()
    }

    /// Backend availability report.
    pub fn detect_backends(&self) -> Vec<BackendInfo> {
        backend::detect_backends(self.gpu.as_ref())
    }

    /// Human-readable backend report.
    pub fn describe_backends(&self) -> String {
        backend::describe_backends(self.gpu.as_ref())
    }

    fn cpu_choice(config: &FilterConfig, spatial_sigma: f32) -> FilterBackend {
        if config.fast_enabled && spatial_sigma >= config.fast_sigma_threshold {
            FilterBackend::Fast
        } else {
            FilterBackend::Reference
        }
    }

    /// Backend [`apply`](Self::apply) would start with for this input.
    ///
    /// May initialize the GPU device.
    pub fn select_backend(&self, input: &LinearImage, spatial_sigma: f32) -> FilterBackend {
        let config = self.config();
        if config.gpu_enabled && input.pixel_count() >= config.gpu_pixel_threshold {
            match self.gpu.initialize() {
                Ok(()) => return FilterBackend::Gpu,
                Err(e) => trace!(error = %e, "GPU not used"),
            }
        }
        Self::cpu_choice(&config, spatial_sigma)
    }

    /// Runs one backend explicitly. Only the GPU backend can fail.
    pub fn apply_with(
        &self,
        backend: FilterBackend,
        input: &LinearImage,
        spatial_sigma: f32,
        range_sigma: f32,
    ) -> FilterResult<LinearImage> {
        match backend {
            FilterBackend::Reference | FilterBackend::Fast => {
                Ok(self.cpu_filter(backend, input, spatial_sigma, range_sigma))
            }
            FilterBackend::Gpu => {
                let out = self.gpu.bilateral(input, spatial_sigma, range_sigma)?;
                if out.dimensions() != input.dimensions() {
                    return Err(FilterError::BufferSizeMismatch {
                        expected: input.pixel_count(),
                        actual: out.pixel_count(),
                    });
                }
                Counters::bump(&self.counters.gpu_runs, 1);
                Ok(out)
            }
        }
    }

    /// Uncached bilateral filter with backend selection and GPU fallback.
    ///
    /// `spatial_sigma <= 0` returns a copy of the input.
    pub fn apply(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        if spatial_sigma <= 0.0 || input.is_empty() {
            return input.clone();
        }
        let chosen = self.select_backend(input, spatial_sigma);
        trace!(backend = %chosen, spatial_sigma, range_sigma, "bilateral");
        match self.apply_with(chosen, input, spatial_sigma, range_sigma) {
            Ok(out) => out,
            Err(e) => {
                let cpu = Self::cpu_choice(&self.config(), spatial_sigma);
                warn!(error = %e, fallback = %cpu, "GPU bilateral failed, falling back to CPU");
                Counters::bump(&self.counters.gpu_fallbacks, 1);
                self.cpu_filter(cpu, input, spatial_sigma, range_sigma)
            }
        }
    }

    fn cpu_filter(&self, backend: FilterBackend, input: &LinearImage, s: f32, r: f32) -> LinearImage {
        let pool = WorkerPool::global();
        if backend == FilterBackend::Fast {
            Counters::bump(&self.counters.fast_runs, 1);
            fast::bilateral(input, s, r, pool)
        } else {
            Counters::bump(&self.counters.reference_runs, 1);
            reference::bilateral(input, s, r, pool)
        }
    }

    /// Reference backend, bypassing selection and cache.
    pub fn apply_reference(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        self.cpu_filter(FilterBackend::Reference, input, spatial_sigma, range_sigma)
    }

    /// Fast backend, bypassing selection and cache.
    pub fn apply_fast(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        self.cpu_filter(FilterBackend::Fast, input, spatial_sigma, range_sigma)
    }

    /// Cached bilateral filter: the default entry point.
    ///
    /// The content hash is computed and the filter runs outside the cache
    /// lock; the lock covers only lookup and insert.
    pub fn apply_cached(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        if spatial_sigma <= 0.0 || input.is_empty() {
            return input.clone();
        }
        if !self.config().cache_enabled {
            return self.apply(input, spatial_sigma, range_sigma);
        }

        let key = HashKey::new(input, spatial_sigma, range_sigma);
        let cached = self.lock_cache().get(&key);
        if let Some(hit) = cached {
            Counters::bump(&self.counters.hits, 1);
            trace!(hash = key.hash, "bilateral cache hit");
            return (*hit).clone();
        }
        Counters::bump(&self.counters.misses, 1);
        trace!(hash = key.hash, "bilateral cache miss");

        let out = Arc::new(self.apply(input, spatial_sigma, range_sigma));
        let outcome = self.lock_cache().insert(key, Arc::clone(&out));
        if outcome.stored {
            Counters::bump(&self.counters.inserts, 1);
        }
        Counters::bump(&self.counters.evictions, outcome.evicted as u64);
        Arc::try_unwrap(out).unwrap_or_else(|shared| (*shared).clone())
    }

    /// `input - bilateral(input)`, per channel, through the cache.
    pub fn extract_detail(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        let base = self.apply_cached(input, spatial_sigma, range_sigma);
        let (ir, ig, ib) = input.planes();
        let (br, bg, bb) = base.planes();
        let sub = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x - y).collect::<Vec<f32>>();
        let mut detail = LinearImage::new(input.width(), input.height());
        let (dr, dg, db) = detail.planes_mut();
        dr.copy_from_slice(&sub(ir, br));
        dg.copy_from_slice(&sub(ig, bg));
        db.copy_from_slice(&sub(ib, bb));
        detail
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("config", &self.config())
            .field("gpu", &self.gpu.name())
            .finish()
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

//! Filter engine configuration.
//!
//! # Environment Variables
//!
//! - `LUX_FILTER_CACHE` - enable the result cache ("1"/"true" or "0"/"false")
//! - `LUX_FILTER_FAST` - enable the fast approximation
//! - `LUX_FILTER_GPU` - enable the GPU backend
//! - `LUX_FILTER_CACHE_ENTRIES` - maximum cached results
//! - `LUX_FILTER_CACHE_MB` - maximum cache size in megabytes
//! - `LUX_FILTER_FAST_SIGMA` - spatial sigma from which the fast path is used
//! - `LUX_FILTER_GPU_PIXELS` - pixel count from which the GPU is tried

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FilterError, FilterResult};

/// Default maximum cached results.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 100;
/// Default cache budget in megabytes.
pub const DEFAULT_MAX_CACHE_MEMORY_MB: usize = 512;
/// Default spatial sigma from which the fast path is used.
pub const DEFAULT_FAST_SIGMA_THRESHOLD: f32 = 4.5;
/// Default pixel count from which the GPU is tried.
pub const DEFAULT_GPU_PIXEL_THRESHOLD: usize = 1_500_000;

/// Runtime-tunable filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Use the content-hash result cache in [`crate::FilterEngine::apply_cached`].
    pub cache_enabled: bool,
    /// Allow the fast approximation for large spatial sigmas.
    pub fast_enabled: bool,
    /// Allow the GPU backend for large images.
    pub gpu_enabled: bool,
    /// Maximum cached results (1-10000).
    pub max_cache_entries: usize,
    /// Maximum cache size in megabytes (1-65536).
    pub max_cache_memory_mb: usize,
    /// Spatial sigma from which the fast path is used, in (0, 100].
    pub fast_sigma_threshold: f32,
    /// Pixel count from which the GPU is tried, in [100000, 100000000].
    pub gpu_pixel_threshold: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            fast_enabled: true,
            gpu_enabled: true,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            max_cache_memory_mb: DEFAULT_MAX_CACHE_MEMORY_MB,
            fast_sigma_threshold: DEFAULT_FAST_SIGMA_THRESHOLD,
            gpu_pixel_threshold: DEFAULT_GPU_PIXEL_THRESHOLD,
        }
    }
}

impl FilterConfig {
    /// Defaults overlaid with `LUX_FILTER_*` variables, sanitized.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_flag("LUX_FILTER_CACHE") {
            cfg.cache_enabled = v;
        }
        if let Some(v) = env_flag("LUX_FILTER_FAST") {
            cfg.fast_enabled = v;
        }
        if let Some(v) = env_flag("LUX_FILTER_GPU") {
            cfg.gpu_enabled = v;
        }
        if let Some(v) = env_parse("LUX_FILTER_CACHE_ENTRIES") {
            cfg.max_cache_entries = v;
        }
        if let Some(v) = env_parse("LUX_FILTER_CACHE_MB") {
            cfg.max_cache_memory_mb = v;
        }
        if let Some(v) = env_parse("LUX_FILTER_FAST_SIGMA") {
            cfg.fast_sigma_threshold = v;
        }
        if let Some(v) = env_parse("LUX_FILTER_GPU_PIXELS") {
            cfg.gpu_pixel_threshold = v;
        }
        cfg.sanitized()
    }

    /// Parses a YAML document; missing fields take defaults.
    pub fn from_yaml_str(yaml: &str) -> FilterResult<Self> {
        let cfg: Self = serde_yaml::from_str(yaml).map_err(|e| FilterError::Config(e.to_string()))?;
        Ok(cfg.sanitized())
    }

    /// Loads a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> FilterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> FilterResult<String> {
        serde_yaml::to_string(self).map_err(|e| FilterError::Config(e.to_string()))
    }

    /// Resets every out-of-range field to its default, logging a warning
    /// per field. Returns the names of the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let mut reset = Vec::new();
        if !(1..=10_000).contains(&self.max_cache_entries) {
            warn!(value = self.max_cache_entries, "max_cache_entries out of range, using default");
            self.max_cache_entries = DEFAULT_MAX_CACHE_ENTRIES;
            reset.push("max_cache_entries");
        }
        if !(1..=65_536).contains(&self.max_cache_memory_mb) {
            warn!(value = self.max_cache_memory_mb, "max_cache_memory_mb out of range, using default");
            self.max_cache_memory_mb = DEFAULT_MAX_CACHE_MEMORY_MB;
            reset.push("max_cache_memory_mb");
        }
        let sigma = self.fast_sigma_threshold;
        if !(sigma > 0.0 && sigma <= 100.0) {
            warn!(value = sigma, "fast_sigma_threshold out of range, using default");
            self.fast_sigma_threshold = DEFAULT_FAST_SIGMA_THRESHOLD;
            reset.push("fast_sigma_threshold");
        }
        if !(100_000..=100_000_000).contains(&self.gpu_pixel_threshold) {
            warn!(value = self.gpu_pixel_threshold, "gpu_pixel_threshold out of range, using default");
            self.gpu_pixel_threshold = DEFAULT_GPU_PIXEL_THRESHOLD;
            reset.push("gpu_pixel_threshold");
        }
        reset
    }

    /// Consuming variant of [`sanitize`](Self::sanitize).
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Cache budget in bytes.
    pub fn max_cache_bytes(&self) -> usize {
        self.max_cache_memory_mb.saturating_mul(1024 * 1024)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let v = env::var(name).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => {
            warn!(var = name, value = %v, "ignoring unrecognized boolean");
            None
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let v = env::var(name).ok()?;
    let parsed = v.trim().parse().ok();
    if parsed.is_none() {
        warn!(var = name, value = %v, "ignoring unparsable value");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = FilterConfig::default();
        assert!(cfg.sanitize().is_empty());
        assert_eq!(cfg.max_cache_entries, 100);
        assert_eq!(cfg.max_cache_bytes(), 512 * 1024 * 1024);
    }

    #[test]
    fn out_of_range_reset() {
        let mut cfg = FilterConfig {
            fast_sigma_threshold: 0.0,
            gpu_pixel_threshold: 10,
            max_cache_entries: 0,
            ..Default::default()
        };
        let reset = cfg.sanitize();
        assert_eq!(reset, vec!["max_cache_entries", "fast_sigma_threshold", "gpu_pixel_threshold"]);
        assert_eq!(cfg, FilterConfig::default());
    }

    #[test]
    fn nan_sigma_reset() {
        let cfg = FilterConfig {
            fast_sigma_threshold: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.fast_sigma_threshold, DEFAULT_FAST_SIGMA_THRESHOLD);
    }

    #[test]
    fn boundary_values_kept() {
        let cfg = FilterConfig {
            fast_sigma_threshold: 100.0,
            gpu_pixel_threshold: 100_000,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.fast_sigma_threshold, 100.0);
        assert_eq!(cfg.gpu_pixel_threshold, 100_000);
    }

    #[test]
    fn yaml_partial() {
        let cfg = FilterConfig::from_yaml_str("gpu_enabled: false\nmax_cache_entries: 8\n").unwrap();
        assert!(!cfg.gpu_enabled);
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.max_cache_entries, 8);
        let back = FilterConfig::from_yaml_str(&cfg.to_yaml().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn yaml_invalid() {
        assert!(matches!(
            FilterConfig::from_yaml_str("max_cache_entries: [1, 2]"),
            Err(FilterError::Config(_))
        ));
    }
}

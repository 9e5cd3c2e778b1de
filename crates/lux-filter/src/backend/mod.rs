//! Bilateral filter backends.
//!
//! # Architecture
//!
//! ```text
//! FilterEngine
//!     +-- reference  O(r^2) per pixel, exact weights, worker pool rows
//!     +-- fast       separable approximation, bounded taps
//!     +-- GpuDevice  wgpu compute kernel (feature "wgpu") or NullGpu
//! ```
//!
//! All backends share the weighting
//! `exp(-d^2 / 2 sigma_s^2) * exp(-dY^2 / 2 sigma_r^2)` with `dY` the
//! Rec.709 luminance difference between centre and neighbour.

pub mod fast;
pub mod reference;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBilateral;

use lux_core::LinearImage;

use crate::error::{FilterError, FilterResult};

/// Filter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterBackend {
    /// Exact O(r^2) bilateral.
    Reference,
    /// Separable approximation.
    Fast,
    /// Compute shader.
    Gpu,
}

impl FilterBackend {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Fast => "fast",
            Self::Gpu => "gpu",
        }
    }
}

impl std::fmt::Display for FilterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// GPU bilateral device.
///
/// `initialize` and `is_available` must be idempotent and cheap after the
/// first call. Failures are reported, never panicked.
pub trait GpuDevice: Send + Sync {
    /// Device name for logs and reports.
    fn name(&self) -> &str;

    /// Prepares the device. Repeated calls return the first outcome.
    fn initialize(&self) -> FilterResult<()>;

    /// `true` once [`initialize`](Self::initialize) succeeded or would succeed.
    fn is_available(&self) -> bool {
        self.initialize().is_ok()
    }

    /// Runs the bilateral filter on the device.
    fn bilateral(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> FilterResult<LinearImage>;
}

/// Device that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGpu;

impl GpuDevice for NullGpu {
    fn name(&self) -> &str {
        "none"
    }

    fn initialize(&self) -> FilterResult<()> {
        Err(FilterError::BackendNotAvailable("built without the wgpu feature".into()))
    }

    fn bilateral(&self, _input: &LinearImage, _s: f32, _r: f32) -> FilterResult<LinearImage> {
        Err(FilterError::BackendNotAvailable("built without the wgpu feature".into()))
    }
}

/// Platform default device: wgpu when compiled in, otherwise [`NullGpu`].
pub fn default_gpu() -> Box<dyn GpuDevice> {
    #[cfg(feature = "wgpu")]
    {
        Box::new(WgpuBilateral::new())
    }
    #[cfg(not(feature = "wgpu"))]
    {
        Box::new(NullGpu)
    }
}

/// Information about a filter backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend
    pub backend: FilterBackend,
    /// Whether the backend can run now
    pub available: bool,
    /// Short description
    pub description: String,
}

/// Lists every backend with its availability.
pub fn detect_backends(gpu: &dyn GpuDevice) -> Vec<BackendInfo> {
    vec![
        BackendInfo {
            backend: FilterBackend::Gpu,
            available: gpu.is_available(),
            description: format!("compute shader ({})", gpu.name()),
        },
        BackendInfo {
            backend: FilterBackend::Fast,
            available: true,
            description: "separable bilateral approximation".into(),
        },
        BackendInfo {
            backend: FilterBackend::Reference,
            available: true,
            description: "exact bilateral, worker pool".into(),
        },
    ]
}

/// One line per backend: `[+] name: description`.
pub fn describe_backends(gpu: &dyn GpuDevice) -> String {
    let mut desc = String::new();
    for info in detect_backends(gpu) {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.backend, info.description));
    }
    desc
}

/// Spatial radius used by every backend: `ceil(3 sigma_s)`.
#[inline]
pub fn radius_for(spatial_sigma: f32) -> usize {
    (3.0 * spatial_sigma).ceil().max(0.0) as usize
}

/// Range weight; a non-positive sigma keeps only exact luminance matches.
#[inline]
pub(crate) fn range_weight(delta: f32, inv_two_sr2: Option<f32>) -> f32 {
    match inv_two_sr2 {
        Some(k) => (-delta * delta * k).exp(),
        None if delta == 0.0 => 1.0,
        None => 0.0,
    }
}

/// `1 / (2 sigma_r^2)`, or `None` for the indicator form.
#[inline]
pub(crate) fn range_coefficient(range_sigma: f32) -> Option<f32> {
    (range_sigma > 0.0).then(|| 1.0 / (2.0 * range_sigma * range_sigma))
}

/// Rec.709 luminance plane of `image`.
pub(crate) fn luminance_plane(image: &LinearImage) -> Vec<f32> {
    let (r, g, b) = image.planes();
    r.iter()
        .zip(g)
        .zip(b)
        .map(|((&r, &g), &b)| lux_core::luminance_rec709([r, g, b]))
        .collect()
}

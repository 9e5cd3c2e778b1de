//! Content hashing for cache keys.

use lux_core::LinearImage;
use xxhash_rust::xxh64::Xxh64;

/// Sigma tolerance for key equality.
pub const SIGMA_TOLERANCE: f32 = 0.001;

/// xxHash64 over the dimensions and every byte of the three planes.
pub fn content_hash(image: &LinearImage) -> u64 {
    let mut hasher = Xxh64::new(0);
    hasher.update(&image.width().to_le_bytes());
    hasher.update(&image.height().to_le_bytes());
    let (r, g, b) = image.planes();
    for plane in [r, g, b] {
        hasher.update(bytemuck::cast_slice(plane));
    }
    hasher.digest()
}

/// Cache key: content hash plus filter sigmas.
#[derive(Debug, Clone, Copy)]
pub struct HashKey {
    /// [`content_hash`] of the input
    pub hash: u64,
    /// Spatial sigma
    pub spatial_sigma: f32,
    /// Range sigma
    pub range_sigma: f32,
}

impl HashKey {
    /// Hashes `image` and pairs it with the sigmas.
    pub fn new(image: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> Self {
        Self {
            hash: content_hash(image),
            spatial_sigma,
            range_sigma,
        }
    }

    /// Same content and both sigmas within [`SIGMA_TOLERANCE`].
    pub fn matches(&self, other: &HashKey) -> bool {
        self.hash == other.hash
            && (self.spatial_sigma - other.spatial_sigma).abs() < SIGMA_TOLERANCE
            && (self.range_sigma - other.range_sigma).abs() < SIGMA_TOLERANCE
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

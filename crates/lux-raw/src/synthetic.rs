//! Deterministic placeholder image for undecodable files.
//!
//! When a container is recognized but its sensor data cannot be located
//! or decoded, the reader returns this gradient instead of an error, so a
//! viewer always has something to show.

use lux_core::{LinearImage, RawMetadata, WorkerPool};

/// Default placeholder size when strips or dimensions are missing.
pub const DEFAULT_SIZE: (u32, u32) = (6000, 4000);

/// Placeholder size after a decode failure part-way through.
pub const FAILURE_SIZE: (u32, u32) = (1200, 1200);

/// Model string reported for synthetic images.
pub const SYNTHETIC_MODEL: &str = "Synthetic";

/// Horizontal red ramp, vertical green ramp, blue falling along the
/// diagonal. Values span [0, 1] scene-linear.
pub fn gradient(width: u32, height: u32) -> LinearImage {
    let mut img = LinearImage::new(width, height);
    let fx = 1.0 / (width.max(2) - 1) as f32;
    let fy = 1.0 / (height.max(2) - 1) as f32;
    WorkerPool::global().map_pixels_xy(&mut img, |x, y, _| {
        let u = x as f32 * fx;
        let v = y as f32 * fy;
        [u, v, 1.0 - 0.5 * (u + v)]
    });
    img
}

/// Gradient plus metadata describing it.
///
/// Fields already known from the container (camera model, EXIF) are kept
/// from `base`.
pub fn placeholder(size: (u32, u32), base: RawMetadata) -> (LinearImage, RawMetadata) {
    let (width, height) = size;
    let meta = RawMetadata {
        width,
        height,
        synthetic: true,
        camera_model: if base.camera_model.is_empty() {
            SYNTHETIC_MODEL.to_string()
        } else {
            base.camera_model.clone()
        },
        ..base
    };
    (gradient(width, height), meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_is_deterministic() {
        let a = gradient(33, 17);
        let b = gradient(33, 17);
        assert_eq!(a, b);
        assert_eq!(a.pixel(0, 0), [0.0, 0.0, 1.0]);
        assert_eq!(a.pixel(32, 16), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn tiny_sizes() {
        let img = gradient(1, 1);
        assert_eq!(img.pixel(0, 0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn placeholder_marks_synthetic() {
        let (img, meta) = placeholder((8, 4), RawMetadata::default());
        assert_eq!(img.dimensions(), (8, 4));
        assert!(meta.synthetic);
        assert_eq!(meta.width, 8);
        assert_eq!(meta.camera_model, SYNTHETIC_MODEL);
    }
}

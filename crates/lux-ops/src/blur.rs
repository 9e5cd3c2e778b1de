//! Separable Gaussian blur on a single float plane.
//!
//! Used by sharpening and dehaze. Edges clamp to the nearest pixel.

use lux_core::{LinearImage, WorkerPool, luminance_rec709};

/// Normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`.
///
/// # Example
///
/// ```rust
/// use lux_ops::blur::gaussian_kernel;
///
/// let k = gaussian_kernel(1.0);
/// assert_eq!(k.len(), 7);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
/// ```
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut k: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for w in &mut k {
        *w /= sum;
    }
    k
}

/// Rec.709 luminance of every pixel.
pub fn luminance_plane(image: &LinearImage) -> Vec<f32> {
    let (r, g, b) = image.planes();
    r.iter()
        .zip(g)
        .zip(b)
        .map(|((&r, &g), &b)| luminance_rec709([r, g, b]))
        .collect()
}

/// Blurs a `width x height` plane with a Gaussian of `sigma` pixels.
pub fn blur_plane(src: &[f32], width: usize, height: usize, sigma: f32, pool: &WorkerPool) -> Vec<f32> {
    if sigma <= 0.0 || width == 0 || height == 0 {
        return src.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut tmp = vec![0.0f32; src.len()];
    pool.for_each_row_chunk(&mut tmp, width, |rows, out| {
        for (ry, y) in rows.enumerate() {
            let row = &src[y * width..(y + 1) * width];
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - radius).clamp(0, width as isize - 1) as usize;
                    acc += row[sx] * w;
                }
                out[ry * width + x] = acc;
            }
        }
    });

    let mut dst = vec![0.0f32; src.len()];
    pool.for_each_row_chunk(&mut dst, width, |rows, out| {
        for (ry, y) in rows.enumerate() {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let sy = (y as isize + k as isize - radius).clamp(0, height as isize - 1) as usize;
                    acc += tmp[sy * width + x] * w;
                }
                out[ry * width + x] = acc;
            }
        }
    });
    dst
}

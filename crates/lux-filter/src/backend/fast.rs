//! Separable bilateral approximation.
//!
//! A horizontal 1D bilateral pass followed by a vertical one on the
//! intermediate result, each with its own luminance plane. Per pixel the
//! cost is O(r) instead of O(r^2); beyond [`MAX_TAPS`] taps per side the
//! kernel is sampled with a stride, which keeps large radii bounded.
//! Output is close to, not equal to, the reference filter.

use lux_core::{LinearImage, WorkerPool};
use tracing::trace;

use super::{luminance_plane, radius_for, range_coefficient, range_weight};

/// Maximum taps per side of the 1D kernel.
pub const MAX_TAPS: usize = 24;

#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
}

struct Kernel {
    offsets: Vec<isize>,
    weights: Vec<f32>,
}

impl Kernel {
    fn new(spatial_sigma: f32, radius: usize) -> Self {
        let step = radius.div_ceil(MAX_TAPS).max(1);
        let inv = 1.0 / (2.0 * spatial_sigma * spatial_sigma);
        let mut offsets = Vec::new();
        let mut weights = Vec::new();
        let r = radius as isize;
        let mut d = -r;
        while d <= r {
            offsets.push(d);
            weights.push((-((d * d) as f32) * inv).exp());
            d += step as isize;
        }
        if !offsets.contains(&0) {
            offsets.push(0);
            weights.push(1.0);
        }
        Self { offsets, weights }
    }
}

/// Runs the separable approximation.
///
/// A non-positive spatial sigma returns a copy of the input.
pub fn bilateral(input: &LinearImage, spatial_sigma: f32, range_sigma: f32, pool: &WorkerPool) -> LinearImage {
    if spatial_sigma <= 0.0 || input.is_empty() {
        return input.clone();
    }
    let radius = radius_for(spatial_sigma);
    let kernel = Kernel::new(spatial_sigma, radius);
    let range_k = range_coefficient(range_sigma);
    trace!(
        width = input.width(),
        height = input.height(),
        radius,
        taps = kernel.offsets.len(),
        "fast bilateral"
    );
    let horizontal = pass(input, &kernel, range_k, Direction::Horizontal, pool);
    pass(&horizontal, &kernel, range_k, Direction::Vertical, pool)
}

fn pass(src: &LinearImage, kernel: &Kernel, range_k: Option<f32>, dir: Direction, pool: &WorkerPool) -> LinearImage {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let lum = luminance_plane(src);
    let (sr, sg, sb) = src.planes();
    let mut out = LinearImage::new(src.width(), src.height());
    pool.for_each_rows(&mut out, |mut band| {
        for i in 0..band.len() {
            let x = i % w;
            let y = band.rows.start + i / w;
            let centre = y * w + x;
            let lc = lum[centre];
            let mut acc = [0.0f32; 3];
            let mut wsum = 0.0f32;
            for (&d, &ws) in kernel.offsets.iter().zip(&kernel.weights) {
                let n = match dir {
                    Direction::Horizontal => {
                        let nx = x as isize + d;
                        if nx < 0 || nx >= w as isize {
                            continue;
                        }
                        y * w + nx as usize
                    }
                    Direction::Vertical => {
                        let ny = y as isize + d;
                        if ny < 0 || ny >= h as isize {
                            continue;
                        }
                        ny as usize * w + x
                    }
                };
                let wgt = ws * range_weight(lum[n] - lc, range_k);
                acc[0] += wgt * sr[n];
                acc[1] += wgt * sg[n];
                acc[2] += wgt * sb[n];
                wsum += wgt;
            }
            if wsum > 0.0 && wsum.is_finite() {
                band.set(i, [acc[0] / wsum, acc[1] / wsum, acc[2] / wsum]);
            } else {
                band.set(i, [sr[centre], sg[centre], sb[centre]]);
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::reference;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_sigma_is_identity() {
        let img = LinearImage::from_fn(5, 5, |x, y| [x as f32, y as f32, 0.5]);
        assert_eq!(bilateral(&img, 0.0, 0.2, WorkerPool::global()), img);
    }

    #[test]
    fn kernel_is_bounded() {
        let k = Kernel::new(40.0, radius_for(40.0));
        assert!(k.offsets.len() <= 2 * MAX_TAPS + 2);
        assert!(k.offsets.contains(&0));
        let small = Kernel::new(1.0, 3);
        assert_eq!(small.offsets, vec![-3, -2, -1, 0, 1, 2, 3]);
    }

    #[test]
    fn constant_image_unchanged() {
        let img = LinearImage::filled(20, 20, [0.2, 0.3, 0.4]);
        let out = bilateral(&img, 6.0, 0.1, WorkerPool::global());
        assert!(out.max_abs_diff(&img) < 1e-5);
    }

    #[test]
    fn preserves_strong_edge() {
        let img = LinearImage::from_fn(32, 16, |x, _| if x < 16 { [0.05; 3] } else { [0.9; 3] });
        let out = bilateral(&img, 5.0, 0.05, WorkerPool::global());
        assert_abs_diff_eq!(out.pixel(15, 8)[1], 0.05, epsilon = 1e-4);
        assert_abs_diff_eq!(out.pixel(16, 8)[1], 0.9, epsilon = 1e-4);
    }

    #[test]
    fn close_to_reference_on_smooth_content() {
        let img = LinearImage::from_fn(40, 30, |x, y| {
            let v = 0.3 + 0.2 * ((x as f32 * 0.2).sin() * (y as f32 * 0.15).cos());
            [v, v * 0.8, v * 0.6]
        });
        let pool = WorkerPool::global();
        let exact = reference::bilateral(&img, 5.0, 0.2, pool);
        let approx = bilateral(&img, 5.0, 0.2, pool);
        let mean_err: f32 = exact
            .green()
            .iter()
            .zip(approx.green())
            .map(|(a, b)| (a - b).abs())
            .sum::<f32>()
            / exact.pixel_count() as f32;
        assert!(mean_err < 0.02, "mean error {}", mean_err);
    }
}

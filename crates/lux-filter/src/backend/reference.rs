//! Exact bilateral filter.
//!
//! Every output pixel is the normalized weighted sum over a
//! `(2r + 1)^2` window clipped to the image, `r = ceil(3 sigma_s)`. The
//! spatial Gaussian is separable: one 1-D table of `r + 1` weights is built
//! per call and a tap at `(dx, dy)` weighs `g[|dx|] * g[|dy|]`. Rows are split across the
//! worker pool; each worker reads the shared input and writes only its own
//! band of the output.

use lux_core::{LinearImage, WorkerPool};
use tracing::trace;

use super::{luminance_plane, radius_for, range_coefficient, range_weight};

/// Runs the exact bilateral filter.
///
/// A non-positive spatial sigma returns a copy of the input. Pixels whose
/// weight sum is zero pass through unchanged.
pub fn bilateral(input: &LinearImage, spatial_sigma: f32, range_sigma: f32, pool: &WorkerPool) -> LinearImage {
    if spatial_sigma <= 0.0 || input.is_empty() {
        return input.clone();
    }
    let (w, h) = (input.width() as usize, input.height() as usize);
    let radius = radius_for(spatial_sigma).min(w.max(h));
    let inv_two_ss2 = 1.0 / (2.0 * spatial_sigma * spatial_sigma);
    let gauss: Vec<f32> = (0..=radius)
        .map(|d| {
            let d = d as f32;
            (-d * d * inv_two_ss2).exp()
        })
        .collect();
    let range_k = range_coefficient(range_sigma);
    let lum = luminance_plane(input);
    let (sr, sg, sb) = input.planes();
    trace!(width = w, height = h, radius, "reference bilateral");

    let mut output = LinearImage::new(input.width(), input.height());
    pool.for_each_rows(&mut output, |mut band| {
        for i in 0..band.len() {
            let x = i % w;
            let y = band.rows.start + i / w;
            let centre = y * w + x;
            let lc = lum[centre];

            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(w - 1);
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius).min(h - 1);

            let mut acc = [0.0f32; 3];
            let mut wsum = 0.0f32;
            for ny in y0..=y1 {
                let gy = gauss[ny.abs_diff(y)];
                let row = ny * w;
                for nx in x0..=x1 {
                    let n = row + nx;
                    let ws = gy * gauss[nx.abs_diff(x)];
                    let wgt = ws * range_weight(lum[n] - lc, range_k);
                    if wgt == 0.0 {
                        continue;
                    }
                    acc[0] += wgt * sr[n];
                    acc[1] += wgt * sg[n];
                    acc[2] += wgt * sb[n];
                    wsum += wgt;
                }
            }
            if wsum > 0.0 && wsum.is_finite() {
                band.set(i, [acc[0] / wsum, acc[1] / wsum, acc[2] / wsum]);
            } else {
                band.set(i, [sr[centre], sg[centre], sb[centre]]);
            }
        }
    });
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(w: u32, h: u32) -> LinearImage {
        LinearImage::from_fn(w, h, |x, y| {
            let v = (x as f32 * 0.07 + y as f32 * 0.03).sin().abs();
            [v, v * 0.5, 1.0 - v]
        })
    }

    #[test]
    fn zero_sigma_is_identity() {
        let img = ramp(9, 7);
        assert_eq!(bilateral(&img, 0.0, 0.1, WorkerPool::global()), img);
    }

    #[test]
    fn constant_image_unchanged() {
        let img = LinearImage::filled(12, 10, [0.3, 0.4, 0.5]);
        let out = bilateral(&img, 2.0, 0.1, WorkerPool::global());
        for i in 0..out.pixel_count() {
            let [r, g, b] = out.pixel_at(i);
            assert_abs_diff_eq!(r, 0.3, epsilon = 1e-5);
            assert_abs_diff_eq!(g, 0.4, epsilon = 1e-5);
            assert_abs_diff_eq!(b, 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn preserves_strong_edge() {
        let img = LinearImage::from_fn(16, 8, |x, _| if x < 8 { [0.05; 3] } else { [0.9; 3] });
        let out = bilateral(&img, 2.0, 0.05, WorkerPool::global());
        assert_abs_diff_eq!(out.pixel(7, 4)[0], 0.05, epsilon = 1e-4);
        assert_abs_diff_eq!(out.pixel(8, 4)[0], 0.9, epsilon = 1e-4);
    }

    #[test]
    fn smooths_small_noise() {
        let img = LinearImage::from_fn(16, 16, |x, y| {
            let n = if (x + y) % 2 == 0 { 0.01 } else { -0.01 };
            [0.5 + n; 3]
        });
        let out = bilateral(&img, 1.5, 0.2, WorkerPool::global());
        assert!((out.pixel(8, 8)[0] - 0.5).abs() < 0.005);
    }

    #[test]
    fn pool_size_does_not_change_result() {
        let img = ramp(23, 17);
        let a = bilateral(&img, 1.2, 0.1, &WorkerPool::sequential());
        let b = bilateral(&img, 1.2, 0.1, &WorkerPool::new(4).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn matches_direct_two_dimensional_weights() {
        let img = ramp(7, 5);
        let (sigma, range) = (1.3f32, 0.3f32);
        let out = bilateral(&img, sigma, range, WorkerPool::global());
        let lum = luminance_plane(&img);
        let k = range_coefficient(range);
        let r = radius_for(sigma) as i32;
        for y in 0..5i32 {
            for x in 0..7i32 {
                let mut acc = [0.0f32; 3];
                let mut wsum = 0.0f32;
                for ny in (y - r).max(0)..=(y + r).min(4) {
                    for nx in (x - r).max(0)..=(x + r).min(6) {
                        let d2 = ((nx - x) * (nx - x) + (ny - y) * (ny - y)) as f32;
                        let n = (ny * 7 + nx) as usize;
                        let wgt = (-d2 / (2.0 * sigma * sigma)).exp()
                            * range_weight(lum[n] - lum[(y * 7 + x) as usize], k);
                        let p = img.pixel_at(n);
                        for c in 0..3 {
                            acc[c] += wgt * p[c];
                        }
                        wsum += wgt;
                    }
                }
                let got = out.pixel(x as u32, y as u32);
                for c in 0..3 {
                    assert_abs_diff_eq!(got[c], acc[c] / wsum, epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn huge_sigma_averages_small_image() {
        let img = LinearImage::from_fn(10, 6, |x, y| [(x + y) as f32 * 0.01; 3]);
        let out = bilateral(&img, 1.0e6, 100.0, WorkerPool::global());
        let mean = (0..img.pixel_count()).map(|i| img.pixel_at(i)[0]).sum::<f32>() / 60.0;
        for i in 0..out.pixel_count() {
            assert_abs_diff_eq!(out.pixel_at(i)[0], mean, epsilon = 1e-3);
        }
    }

    #[test]
    fn indicator_range_sigma() {
        let img = LinearImage::from_fn(6, 6, |x, _| [x as f32 * 0.1; 3]);
        let out = bilateral(&img, 1.0, 0.0, WorkerPool::global());
        // only same-luminance neighbours contribute: columns are constant
        assert!(out.max_abs_diff(&img) < 1e-6);
    }
}

//! Reusable fork/join worker pool for pixel kernels.
//!
//! Every expensive pixel operation fans out over a small fixed set of
//! workers and blocks until all of them join. Work is split into equal
//! contiguous row slices; the last slice absorbs the remainder.
//!
//! ```text
//! rows 0..10, 4 workers:  [0..2] [2..4] [4..6] [6..10]
//! ```
//!
//! The pool is built once (see [`WorkerPool::global`]) and reused by every
//! call, so slider-rate invocations never spawn threads.
//!
//! # Environment Variables
//!
//! - `LUX_WORKERS` - worker count override (1-64)

use std::env;
use std::ops::Range;
use std::sync::OnceLock;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::image::LinearImage;
use crate::pixel::Rgb;

/// Upper bound on default worker count.
pub const MAX_WORKERS: usize = 4;

static HARDWARE_THREADS: OnceLock<usize> = OnceLock::new();
static GLOBAL_POOL: OnceLock<WorkerPool> = OnceLock::new();

/// Detect available hardware threads.
pub fn hardware_threads() -> usize {
    *HARDWARE_THREADS.get_or_init(|| {
        sys_info::cpu_num()
            .ok()
            .map(|n| n as usize)
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    })
}

/// Default worker count: `min(4, hardware threads)`, or `LUX_WORKERS`.
pub fn default_workers() -> usize {
    env::var("LUX_WORKERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| (1..=64).contains(&n))
        .unwrap_or_else(|| hardware_threads().min(MAX_WORKERS))
}

/// Splits `rows` into at most `parts` equal contiguous ranges.
///
/// The last range absorbs `rows % parts`. Never returns empty ranges.
pub fn row_partition(rows: usize, parts: usize) -> Vec<Range<usize>> {
    if rows == 0 {
        return Vec::new();
    }
    let parts = parts.clamp(1, rows);
    let base = rows / parts;
    (0..parts)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == parts { rows } else { start + base };
            start..end
        })
        .collect()
}

fn split_rows<'a, T>(mut data: &'a mut [T], row_len: usize, ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut out = Vec::with_capacity(ranges.len());
    for r in ranges {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(r.len() * row_len);
        out.push(head);
        data = tail;
    }
    out
}

/// Mutable view of a contiguous band of rows across all three planes.
pub struct PlaneRows<'a> {
    /// Image rows covered by this band
    pub rows: Range<usize>,
    /// Image width in pixels
    pub width: usize,
    /// Red samples of the band
    pub r: &'a mut [f32],
    /// Green samples of the band
    pub g: &'a mut [f32],
    /// Blue samples of the band
    pub b: &'a mut [f32],
}

impl PlaneRows<'_> {
    /// Reads the pixel at band-local index `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Rgb {
        [self.r[i], self.g[i], self.b[i]]
    }

    /// Writes the pixel at band-local index `i`.
    #[inline]
    pub fn set(&mut self, i: usize, rgb: Rgb) {
        self.r[i] = rgb[0];
        self.g[i] = rgb[1];
        self.b[i] = rgb[2];
    }

    /// Number of pixels in the band.
    #[inline]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// `true` if the band holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

/// Fixed-size fork/join pool.
pub struct WorkerPool {
    pool: Option<rayon::ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        if workers == 1 {
            return Ok(Self::sequential());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("lux-worker-{}", i))
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;
        debug!(workers, "worker pool created");
        Ok(Self {
            pool: Some(pool),
            workers,
        })
    }

    /// A pool that runs every slice on the calling thread.
    pub fn sequential() -> Self {
        Self {
            pool: None,
            workers: 1,
        }
    }

    /// Process-wide pool sized by [`default_workers`].
    pub fn global() -> &'static WorkerPool {
        GLOBAL_POOL.get_or_init(|| {
            let n = default_workers();
            Self::new(n).unwrap_or_else(|e| {
                warn!(error = %e, "falling back to sequential execution");
                Self::sequential()
            })
        })
    }

    /// Number of workers.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Row slices this pool would use for `rows` rows.
    pub fn partition(&self, rows: usize) -> Vec<Range<usize>> {
        row_partition(rows, self.workers)
    }

    fn execute<J, F>(&self, jobs: Vec<J>, f: F)
    where
        J: Send,
        F: Fn(J) + Sync,
    {
        match &self.pool {
            Some(pool) if jobs.len() > 1 => pool.install(|| jobs.into_par_iter().for_each(&f)),
            _ => jobs.into_iter().for_each(&f),
        }
    }

    /// Runs `f` on each row band of an interleaved buffer.
    ///
    /// `data` holds `row_len` elements per row; `f` receives the row range
    /// and the matching mutable sub-slice.
    pub fn for_each_row_chunk<T, F>(&self, data: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(Range<usize>, &mut [T]) + Sync,
    {
        if row_len == 0 {
            return;
        }
        let ranges = self.partition(data.len() / row_len);
        let chunks = split_rows(data, row_len, &ranges);
        let jobs: Vec<_> = ranges.into_iter().zip(chunks).collect();
        self.execute(jobs, |(rows, chunk)| f(rows, chunk));
    }

    /// Runs `f` on each row band of a planar image.
    pub fn for_each_rows<F>(&self, image: &mut LinearImage, f: F)
    where
        F: Fn(PlaneRows<'_>) + Sync,
    {
        let width = image.width() as usize;
        let ranges = self.partition(image.height() as usize);
        let (r, g, b) = image.planes_mut();
        let rs = split_rows(r, width, &ranges);
        let gs = split_rows(g, width, &ranges);
        let bs = split_rows(b, width, &ranges);
        let jobs: Vec<PlaneRows<'_>> = ranges
            .into_iter()
            .zip(rs.into_iter().zip(gs.into_iter().zip(bs)))
            .map(|(rows, (r, (g, b)))| PlaneRows {
                rows,
                width,
                r,
                g,
                b,
            })
            .collect();
        self.execute(jobs, f);
    }

    /// Applies `f` to every pixel in place.
    pub fn map_pixels<F>(&self, image: &mut LinearImage, f: F)
    where
        F: Fn(Rgb) -> Rgb + Sync,
    {
        self.for_each_rows(image, |mut band| {
            for i in 0..band.len() {
                let out = f(band.get(i));
                band.set(i, out);
            }
        });
    }

    /// Applies `f(x, y, rgb)` to every pixel in place.
    pub fn map_pixels_xy<F>(&self, image: &mut LinearImage, f: F)
    where
        F: Fn(u32, u32, Rgb) -> Rgb + Sync,
    {
        self.for_each_rows(image, |mut band| {
            let width = band.width;
            let first = band.rows.start;
            for i in 0..band.len() {
                let x = (i % width) as u32;
                let y = (first + i / width) as u32;
                let out = f(x, y, band.get(i));
                band.set(i, out);
            }
        });
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

//! Image buffers for the development pipeline.
//!
//! - [`LinearImage`] - planar scene-linear RGB, the buffer every stage mutates
//! - [`OutputImage`] - interleaved 8-bit RGBA for display
//!
//! # Memory Layout
//!
//! `LinearImage` is planar: three independent `Vec<f32>`, each row-major,
//! top-to-bottom.
//!
//! ```text
//! R plane: [r00 r01 r02 ... r10 r11 ...]
//! G plane: [g00 g01 g02 ... g10 g11 ...]
//! B plane: [b00 b01 b02 ... b10 b11 ...]
//! ```
//!
//! Every plane always holds exactly `width * height` values. Values are
//! scene-linear radiance, nominally in `[0, +inf)`. They are never
//! gamma-encoded; encoding happens only when producing an [`OutputImage`].
//!
//! # Usage
//!
//! ```rust
//! use lux_core::LinearImage;
//!
//! let mut img = LinearImage::filled(4, 2, [0.18, 0.18, 0.18]);
//! img.set_pixel(1, 1, [1.0, 0.5, 0.25]);
//! assert_eq!(img.pixel(1, 1), [1.0, 0.5, 0.25]);
//! assert_eq!(img.pixel_count(), 8);
//! ```

use crate::error::{Error, Result};
use crate::pixel::Rgb;

/// Number of bytes in one float plane sample.
const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Checked `width * height` as `usize`.
fn element_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| Error::invalid_dimensions(width, height, "pixel count overflows usize"))
}

/// Planar scene-linear RGB image.
#[derive(Clone, PartialEq)]
pub struct LinearImage {
    width: u32,
    height: u32,
    r: Vec<f32>,
    g: Vec<f32>,
    b: Vec<f32>,
}

impl LinearImage {
    /// Creates a black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 3])
    }

    /// Creates an image with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: Rgb) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            r: vec![rgb[0]; n],
            g: vec![rgb[1]; n],
            b: vec![rgb[2]; n],
        }
    }

    /// Creates an image from three planes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if any plane length differs from
    /// `width * height`.
    pub fn from_planes(
        width: u32,
        height: u32,
        r: Vec<f32>,
        g: Vec<f32>,
        b: Vec<f32>,
    ) -> Result<Self> {
        let n = element_count(width, height)?;
        for (name, plane) in [("R", &r), ("G", &g), ("B", &b)] {
            if plane.len() != n {
                return Err(Error::invalid_dimensions(
                    width,
                    height,
                    format!("{} plane: expected {} elements, got {}", name, n, plane.len()),
                ));
            }
        }
        Ok(Self {
            width,
            height,
            r,
            g,
            b,
        })
    }

    /// Creates an image from interleaved `[R G B R G B ...]` data.
    pub fn from_interleaved(width: u32, height: u32, data: &[f32]) -> Result<Self> {
        let n = element_count(width, height)?;
        if data.len() != n * 3 {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} elements, got {}", n * 3, data.len()),
            ));
        }
        let mut img = Self::new(width, height);
        for (i, px) in data.chunks_exact(3).enumerate() {
            img.r[i] = px[0];
            img.g[i] = px[1];
            img.b[i] = px[2];
        }
        Ok(img)
    }

    /// Creates an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> Rgb,
    {
        let mut img = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let i = img.index(x, y);
                let [r, g, b] = f(x, y);
                img.r[i] = r;
                img.g[i] = g;
                img.b[i] = b;
            }
        }
        img
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.r.len()
    }

    /// `true` if the image holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Memory held by the three float planes, `w * h * 3 * 4` bytes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.pixel_count() * 3 * SAMPLE_BYTES
    }

    /// Linear index of pixel `(x, y)` into each plane.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Red plane.
    #[inline]
    pub fn red(&self) -> &[f32] {
        &self.r
    }

    /// Green plane.
    #[inline]
    pub fn green(&self) -> &[f32] {
        &self.g
    }

    /// Blue plane.
    #[inline]
    pub fn blue(&self) -> &[f32] {
        &self.b
    }

    /// All three planes.
    #[inline]
    pub fn planes(&self) -> (&[f32], &[f32], &[f32]) {
        (&self.r, &self.g, &self.b)
    }

    /// All three planes, mutably.
    #[inline]
    pub fn planes_mut(&mut self) -> (&mut [f32], &mut [f32], &mut [f32]) {
        (&mut self.r, &mut self.g, &mut self.b)
    }

    /// Consumes the image and returns its planes.
    pub fn into_planes(self) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        (self.r, self.g, self.b)
    }

    /// Reads pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = self.index(x, y);
        [self.r[i], self.g[i], self.b[i]]
    }

    /// Reads pixel `(x, y)`, or `None` if out of bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.pixel(x, y))
    }

    /// Reads the pixel at a linear index.
    #[inline]
    pub fn pixel_at(&self, i: usize) -> Rgb {
        [self.r[i], self.g[i], self.b[i]]
    }

    /// Writes pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the image.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: Rgb) {
        let i = self.index(x, y);
        self.r[i] = rgb[0];
        self.g[i] = rgb[1];
        self.b[i] = rgb[2];
    }

    /// Writes pixel `(x, y)` with bounds checking.
    pub fn try_set_pixel(&mut self, x: u32, y: u32, rgb: Rgb) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        self.set_pixel(x, y, rgb);
        Ok(())
    }

    /// Overwrites `self` with `other`, reallocating if the sizes differ.
    pub fn copy_from(&mut self, other: &LinearImage) {
        if self.dimensions() == other.dimensions() {
            self.r.copy_from_slice(&other.r);
            self.g.copy_from_slice(&other.g);
            self.b.copy_from_slice(&other.b);
        } else {
            *self = other.clone();
        }
    }

    /// Per-channel `self - other`.
    ///
    /// The result may hold negative values; it is a signed detail layer,
    /// not a radiance image.
    pub fn difference(&self, other: &LinearImage) -> Result<LinearImage> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::dimension_mismatch(self.dimensions(), other.dimensions()));
        }
        let sub = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x - y).collect::<Vec<_>>();
        Ok(LinearImage {
            width: self.width,
            height: self.height,
            r: sub(&self.r, &other.r),
            g: sub(&self.g, &other.g),
            b: sub(&self.b, &other.b),
        })
    }

    /// Largest absolute per-sample difference to `other`.
    ///
    /// Returns `f32::INFINITY` when dimensions differ.
    pub fn max_abs_diff(&self, other: &LinearImage) -> f32 {
        if self.dimensions() != other.dimensions() {
            return f32::INFINITY;
        }
        let (a, b) = (self.planes(), other.planes());
        [(a.0, b.0), (a.1, b.1), (a.2, b.2)]
            .iter()
            .flat_map(|(p, q)| p.iter().zip(q.iter()))
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    /// Interleaves the planes into `[R G B R G B ...]`.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.pixel_count() * 3);
        for i in 0..self.pixel_count() {
            out.extend_from_slice(&[self.r[i], self.g[i], self.b[i]]);
        }
        out
    }

    /// Mean of every channel.
    pub fn mean(&self) -> Rgb {
        if self.is_empty() {
            return [0.0; 3];
        }
        let n = self.pixel_count() as f64;
        let avg = |p: &[f32]| (p.iter().map(|&v| v as f64).sum::<f64>() / n) as f32;
        [avg(&self.r), avg(&self.g), avg(&self.b)]
    }
}

impl std::fmt::Debug for LinearImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Display-referred 8-bit RGBA buffer.
///
/// Row-major, 4 bytes per pixel, no row padding.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl OutputImage {
    /// Bytes per output pixel.
    pub const CHANNELS: usize = 4;

    /// Creates a zeroed buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    /// Wraps existing RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let n = element_count(width, height)? * Self::CHANNELS;
        if data.len() != n {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} bytes, got {}", n, data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Resizes the buffer to `width x height` if it does not match.
    ///
    /// Returns `true` when a reallocation happened.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let n = width as usize * height as usize * Self::CHANNELS;
        if self.width == width && self.height == height && self.data.len() == n {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(n, 0);
        true
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable RGBA bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Reads pixel `(x, y)` as `[R, G, B, A]`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

impl std::fmt::Debug for OutputImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

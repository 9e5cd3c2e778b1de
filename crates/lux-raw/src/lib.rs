//! TIFF-family RAW decoding for lux.
//!
//! Reads CFA sensor data from DNG/NEF/ARW/CR2/ORF/RW2/PEF and friends,
//! normalizes it against the black/white levels and demosaics it into a
//! scene-linear [`LinearImage`](lux_core::LinearImage).
//!
//! # Structure
//!
//! ```text
//! detect ─▶ tiff ─▶ decode ─▶ demosaic
//!   │         │                  ▲
//!   │         └─▶ preview        │
//!   └──────▶ reader ─────────────┘ ─▶ synthetic (fallback)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! let (image, meta) = lux_raw::parse("photo.dng")?;
//! assert_eq!(image.dimensions(), (meta.width, meta.height));
//! # Ok::<(), lux_raw::RawError>(())
//! ```

#![warn(missing_docs)]

pub mod decode;
pub mod demosaic;
pub mod detect;
pub mod error;
pub mod preview;
pub mod reader;
pub mod synthetic;
pub mod tiff;
pub mod writer;

use std::path::Path;

pub use demosaic::{demosaic, demosaic_with};
pub use detect::{ByteOrder, Detection, RawFormat, is_raw_path};
pub use error::{RawError, RawResult};
pub use preview::{PreviewImage, decode_preview, extract_preview};
pub use reader::{DecodeOptions, RawReader, metadata_from_bytes};
pub use writer::{BayerTiffWriter, SampleLayout};

use lux_core::{LinearImage, RawMetadata};

/// Parses a RAW file with default options.
pub fn parse<P: AsRef<Path>>(path: P) -> RawResult<(LinearImage, RawMetadata)> {
    RawReader::new().parse(path)
}

/// Reads only the metadata of a RAW file.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> RawResult<RawMetadata> {
    RawReader::new().metadata(path)
}

/// Extracts and decodes the embedded preview of a RAW file.
///
/// Returns `Ok(None)` when the file has no embedded JPEG.
pub fn read_preview<P: AsRef<Path>>(path: P) -> RawResult<Option<PreviewImage>> {
    let data = std::fs::read(path)?;
    extract_preview(&data).map(decode_preview).transpose()
}

//! Filter engine errors.
//!
//! These stay inside the engine: the public filtering calls fall back to a
//! CPU backend instead of returning them.

use thiserror::Error;

/// Filter backend error.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Backend is compiled out or has no usable device.
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    /// GPU device creation failed.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// Backend operation failed at run time.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Buffer does not match the image it describes.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected element count
        expected: usize,
        /// Actual element count
        actual: usize,
    },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

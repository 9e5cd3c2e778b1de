//! Pipeline errors.

use lux_raw::RawError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by [`crate::Pipeline`] and [`crate::ParameterSet`].
///
/// Kernels never fail; only decoding, preset I/O and pool creation do.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// RAW container could not be read.
    #[error("raw decode failed: {0}")]
    Raw(#[from] RawError),

    /// Buffer or worker pool error.
    #[error(transparent)]
    Core(#[from] lux_core::Error),

    /// Parameter preset could not be parsed or serialized.
    #[error("invalid parameters: {0}")]
    Params(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// `true` when the error came from the RAW reader.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

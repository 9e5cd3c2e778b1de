//! Error types for RAW container operations.

use std::io;
use thiserror::Error;

/// RAW container error.
///
/// Only open failures and unrecognized headers reach callers of
/// [`crate::RawReader::parse`]; decoding problems past a valid header
/// degrade to a synthetic image instead.
#[derive(Debug, Error)]
pub enum RawError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header is not a TIFF-family signature.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Data ends before a structure it points to.
    #[error("truncated data: need {needed} bytes at offset {offset}, file has {len}")]
    Truncated {
        /// Offset of the read
        offset: usize,
        /// Bytes required
        needed: usize,
        /// Total bytes available
        len: usize,
    },

    /// Tag has an unexpected type or count.
    #[error("invalid tag 0x{tag:04X}: {reason}")]
    InvalidTag {
        /// Tag id
        tag: u16,
        /// What was wrong
        reason: String,
    },

    /// Required data is missing.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Sample layout is not supported.
    #[error("unsupported layout: {0}")]
    Unsupported(String),

    /// Embedded preview could not be decoded.
    #[error("preview decode error: {0}")]
    Preview(String),

    /// Core buffer error.
    #[error(transparent)]
    Core(#[from] lux_core::Error),
}

impl RawError {
    /// Creates a [`RawError::InvalidTag`] error.
    pub fn invalid_tag(tag: u16, reason: impl Into<String>) -> Self {
        Self::InvalidTag {
            tag,
            reason: reason.into(),
        }
    }

    /// `true` for failures a caller must handle (open/header).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::InvalidHeader(_))
    }
}

/// Result type for RAW operations.
pub type RawResult<T> = Result<T, RawError>;

//! Error types for embedding and extraction.

use thiserror::Error;

/// Result type alias for all embedding operations.
pub type Result<T> = std::result::Result<T, HistegError>;

/// Errors that can occur while concealing or recovering a payload.
#[derive(Error, Debug)]
pub enum HistegError {
    /// The cover cannot be parsed down to its quantized coefficients.
    #[error("JPEG decoding failed: {reason}")]
    DecodeFailed { reason: String },

    /// Re-serialization of the mutated coefficients failed.
    #[error("JPEG encoding failed: {reason}")]
    EncodeFailed { reason: String },

    /// The payload does not fit into the cover's carrier capacity.
    #[error("payload too large: only {written} of {payload} bytes fit the cover")]
    PayloadTooLarge { written: usize, payload: usize },

    /// Extraction ended before the destination buffer was filled.
    /// Indicates a corrupted cover or a logic bug.
    #[error("extraction incomplete: {read} of {expected} bytes recovered")]
    ExtractIncomplete { read: usize, expected: usize },

    /// The partner map self-check failed over the 16-bit value domain.
    #[error("partner map self-check failed at value {value:#06x}: {reason}")]
    CorrelationViolation { value: u16, reason: &'static str },

    /// The OS random source refused to deliver bytes.
    #[error("OS random source failed")]
    RngFailed(#[source] rand::Error),

    /// I/O error from the file driver.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! LUT error types.

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors from LUT synthesis and manipulation.
///
/// These are data-quality failures: the functions assume validated
/// finite inputs and fail fast instead of recovering, because a
/// malformed table persisted into a profile mis-colors a real display.
#[derive(Debug, Error)]
pub enum LutError {
    /// A LUT or measurement curve is shorter than two entries.
    #[error("LUT length must be >= 2, got {0}")]
    TooShort(usize),

    /// A curve contains a non-finite value.
    #[error("curve contains a non-finite value at index {0}")]
    NotFinite(usize),

    /// Channel lengths of an RGB LUT differ.
    #[error("RGB LUT channels must have equal length: {red}/{green}/{blue}")]
    ChannelMismatch {
        /// Red channel length
        red: usize,
        /// Green channel length
        green: usize,
        /// Blue channel length
        blue: usize,
    },

    /// A scale factor was zero or negative.
    #[error("LUT scale must be > 0, got {0}")]
    NonPositiveScale(f64),
}

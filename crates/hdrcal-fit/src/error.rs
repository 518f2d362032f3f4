//! Fit error types.

use thiserror::Error;

/// Result type for fit operations.
pub type FitResult<T> = Result<T, FitError>;

/// Errors from correction-matrix fitting.
///
/// All of these indicate data-quality or programming problems, not
/// transient conditions; callers surface them instead of retrying.
#[derive(Debug, Error)]
pub enum FitError {
    /// The sample set is empty.
    #[error("no samples provided")]
    NoSamples,

    /// Measured and target sample counts differ.
    #[error("sample count mismatch: {measured} measured vs {target} target")]
    SampleCountMismatch {
        /// Number of measured samples
        measured: usize,
        /// Number of target samples
        target: usize,
    },

    /// Weight vector length does not match the sample count.
    #[error("weights length mismatch: {weights} weights for {samples} samples")]
    WeightCountMismatch {
        /// Number of weights
        weights: usize,
        /// Number of samples
        samples: usize,
    },

    /// Every sample was dropped during chromaticity conversion.
    #[error("no valid samples after chromaticity conversion")]
    NoValidSamples,

    /// The normal-equation or KKT system is singular even after the
    /// degenerate-system fallback.
    #[error("fit system is singular, sample set is degenerate")]
    SingularSystem,
}

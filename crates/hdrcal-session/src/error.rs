//! Calibration error taxonomy.

use thiserror::Error;

/// Result type for calibration operations.
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Errors surfaced by the orchestration layer.
///
/// Instrument failures always trigger subprocess cleanup; numeric and
/// fit failures are data-quality problems surfaced immediately;
/// cancellation is a normal early exit that still guarantees cleanup.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The selected display is not in HDR mode; calibration cannot
    /// proceed.
    #[error("display {0:?} is not in HDR mode, enable HDR in system settings first")]
    HdrInactive(String),

    /// Another calibration run is already active.
    #[error("a calibration run is already in progress")]
    AlreadyRunning,

    /// The user cancelled at a confirmation point.
    #[error("cancelled by user")]
    Cancelled,

    /// A stage ran before the stage that produces its input.
    #[error("stage ordering violation: {0}")]
    StageOrder(&'static str),

    /// Instrument I/O failure.
    #[error(transparent)]
    Instrument(#[from] hdrcal_instrument::InstrumentError),

    /// Matrix fit failure.
    #[error(transparent)]
    Fit(#[from] hdrcal_fit::FitError),

    /// LUT synthesis failure.
    #[error(transparent)]
    Lut(#[from] hdrcal_lut::LutError),

    /// Gamut basis failure.
    #[error(transparent)]
    Gamut(#[from] hdrcal_primaries::GamutError),

    /// Profile validation/persistence failure.
    #[error(transparent)]
    Profile(#[from] hdrcal_profile::ProfileError),

    /// OS color-directory failure.
    #[error("color directory error: {0}")]
    ColorDirectory(#[from] std::io::Error),
}

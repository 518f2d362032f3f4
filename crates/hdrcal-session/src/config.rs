//! Calibration run parameters.

use crate::display::DisplayInfo;
use std::time::Duration;

/// Which reference gamut(s) the chromaticity fit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetColorSpace {
    /// sRGB test colors only.
    #[default]
    Srgb,
    /// sRGB plus the Display P3 additions (wide-gamut panels).
    SrgbAndDisplayP3,
}

/// Parameters of one calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// The display being calibrated.
    pub display: DisplayInfo,
    /// Gray-ramp sample count for the PQ curve stage (2..=1024).
    pub pq_points: usize,
    /// Reference gamut(s) for the chromaticity fit.
    pub color_space: TargetColorSpace,
    /// Lift the whole target curve by a fixed PQ offset.
    pub bright_mode: bool,
    /// Entries per synthesized LUT channel.
    pub lut_entries: usize,
    /// Settle delay between showing a gamut/color patch and reading.
    ///
    /// Physical requirement: the panel's temporal processing needs to
    /// stabilize before the reading is representative. Do not trim
    /// below the panel's stabilization time.
    pub patch_settle: Duration,
    /// Settle delay for the (dense) gray-ramp samples.
    pub ramp_settle: Duration,
    /// Delay after installing/removing a preview profile.
    pub preview_settle: Duration,
}

impl CalibrationConfig {
    /// Default parameters for a display.
    pub fn new(display: DisplayInfo) -> Self {
        Self {
            display,
            pq_points: 128,
            color_space: TargetColorSpace::Srgb,
            bright_mode: false,
            lut_entries: 4096,
            patch_settle: Duration::from_millis(100),
            ramp_settle: Duration::from_millis(30),
            preview_settle: Duration::from_millis(500),
        }
    }

    /// PQ sample count clamped to the supported range.
    pub fn pq_points_clamped(&self) -> usize {
        self.pq_points.clamp(2, 1024)
    }
}

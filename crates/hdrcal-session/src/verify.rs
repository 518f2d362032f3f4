//! Post-calibration verification sweep.
//!
//! Measures a dense gray ramp plus a colored test suite and reports
//! ΔE_ITP statistics against the ideal BT.2020/PQ targets. Run with
//! the preview (or installed profile) active to judge the corrected
//! panel.

use crate::config::CalibrationConfig;
use crate::session::CancelToken;
use crate::CalibrationResult;
use hdrcal_color::{bt2020, deltae::delta_e_itp};
use hdrcal_instrument::{Colorimeter, PatternGenerator};
use hdrcal_math::Vec3;
use hdrcal_primaries::REC2020;
use hdrcal_targets::{SRGB_TEST_COLORS_XY, chromaticity_targets, white_measurement_ladder};
use hdrcal_transfer::pq;
use tracing::{info, warn};

/// Gray-ramp sample count of the verification sweep.
const GRAY_POINTS: usize = 256;

/// One verified patch.
#[derive(Debug, Clone)]
pub struct PatchResult {
    /// The intended XYZ (normalized).
    pub target: Vec3,
    /// The measured XYZ (normalized).
    pub measured: Vec3,
    /// ΔE_ITP between them.
    pub delta_e: f64,
}

/// Result of a verification sweep.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Intended PQ code per gray sample.
    pub target_pq: Vec<f64>,
    /// Measured PQ code per gray sample.
    pub measured_pq: Vec<f64>,
    /// Gray patches inside the care range, with ΔE_ITP.
    pub gray: Vec<PatchResult>,
    /// Colored patches, with ΔE_ITP.
    pub colored: Vec<PatchResult>,
    /// Lower edge of the gray care range (nits).
    pub min_care_nits: f64,
    /// Upper edge of the gray care range (nits).
    pub max_care_nits: f64,
    /// Mean gray ΔE_ITP inside the care range.
    pub gray_avg: f64,
    /// Worst gray ΔE_ITP inside the care range.
    pub gray_max: f64,
    /// Mean colored ΔE_ITP.
    pub colored_avg: f64,
    /// Worst colored ΔE_ITP.
    pub colored_max: f64,
}

fn stats(patches: &[PatchResult]) -> (f64, f64) {
    if patches.is_empty() {
        return (0.0, 0.0);
    }
    let sum: f64 = patches.iter().map(|p| p.delta_e).sum();
    let max = patches.iter().map(|p| p.delta_e).fold(0.0, f64::max);
    (sum / patches.len() as f64, max)
}

/// Runs the verification sweep.
///
/// Instrument shutdown stays with the caller, which owns the handles;
/// every measurement honors the cancel token.
pub fn run_verification(
    pattern: &mut dyn PatternGenerator,
    meter: &mut dyn Colorimeter,
    config: &CalibrationConfig,
    cancel: &CancelToken,
) -> CalibrationResult<VerificationReport> {
    let max_code = pattern.mode().max_code();
    let mut target_pq = Vec::with_capacity(GRAY_POINTS);
    let mut measured_pq = Vec::with_capacity(GRAY_POINTS);
    let mut gray_targets = Vec::with_capacity(GRAY_POINTS);
    let mut gray_measured = Vec::with_capacity(GRAY_POINTS);

    info!("measuring gray-ramp response");
    for i in 0..GRAY_POINTS {
        if cancel.is_cancelled() {
            return Err(crate::CalibrationError::Cancelled);
        }
        let code = (i as f64 * max_code as f64 / (GRAY_POINTS - 1) as f64).round() as u32;
        let v = code as f64 / max_code as f64;
        gray_targets.push(bt2020::pq_rgb_to_xyz([v, v, v]));
        target_pq.push(v);

        pattern.display([code; 3])?;
        std::thread::sleep(config.patch_settle);
        let xyz = meter.measure()?;
        info!(sample = i + 1, total = GRAY_POINTS, code, nits = xyz.y, "gray sample");
        gray_measured.push(xyz / pq::L_MAX);
        measured_pq.push(pq::oetf(xyz.y));
    }

    // Colored accuracy suite against an ideal BT.2020 panel capped at
    // the measured peak
    let peak_norm = gray_measured
        .iter()
        .map(|m| m.y)
        .fold(0.0, f64::max);
    let mut colored_targets = Vec::new();
    for anchor in white_measurement_ladder(peak_norm * pq::L_MAX) {
        colored_targets.extend(chromaticity_targets(&REC2020, anchor, SRGB_TEST_COLORS_XY)?);
    }

    info!(count = colored_targets.len(), "measuring colored patches");
    let mut colored = Vec::with_capacity(colored_targets.len());
    for (i, target) in colored_targets.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(crate::CalibrationError::Cancelled);
        }
        let pq_rgb = bt2020::xyz_to_pq_rgb(*target);
        let rgb = [
            (pq_rgb[0] * max_code as f64).round() as u32,
            (pq_rgb[1] * max_code as f64).round() as u32,
            (pq_rgb[2] * max_code as f64).round() as u32,
        ];
        pattern.display(rgb)?;
        std::thread::sleep(config.patch_settle);
        let measured = meter.measure()? / pq::L_MAX;
        let de = delta_e_itp(*target, measured);
        info!(sample = i + 1, total = colored_targets.len(), delta_e = de, "colored sample");
        colored.push(PatchResult {
            target: *target,
            measured,
            delta_e: de,
        });
    }

    // Grays only count inside the care range: just above the black
    // floor, just below clipping
    let first_y = gray_measured.first().map_or(0.0, |m| m.y);
    let last_y = gray_measured.last().map_or(0.0, |m| m.y);
    let min_care = (first_y * 1.1).max(1.0 / pq::L_MAX);
    let max_care = last_y * 0.9;
    let gray: Vec<PatchResult> = gray_targets
        .iter()
        .zip(&gray_measured)
        .filter(|(_, m)| m.y > min_care && m.y < max_care)
        .map(|(&t, &m)| PatchResult {
            target: t,
            measured: m,
            delta_e: delta_e_itp(t, m),
        })
        .collect();
    if gray.is_empty() {
        warn!("no gray samples inside the care range");
    }

    let (gray_avg, gray_max) = stats(&gray);
    let (colored_avg, colored_max) = stats(&colored);
    info!(
        min_care_nits = min_care * pq::L_MAX,
        max_care_nits = max_care * pq::L_MAX,
        gray_avg,
        gray_max,
        colored_avg,
        colored_max,
        "verification summary"
    );

    Ok(VerificationReport {
        target_pq,
        measured_pq,
        gray,
        colored,
        min_care_nits: min_care * pq::L_MAX,
        max_care_nits: max_care * pq::L_MAX,
        gray_avg,
        gray_max,
        colored_avg,
        colored_max,
    })
}

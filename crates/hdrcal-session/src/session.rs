//! The calibration state machine.

use crate::config::{CalibrationConfig, TargetColorSpace};
use crate::display::ColorDirectory;
use crate::gamut::{GAMUT_PATCHES, GamutMeasurement};
use crate::{CalibrationError, CalibrationResult};
use hdrcal_color::{bt2020, xyz::l2_normalize};
use hdrcal_fit::{FitOptions, fit_xyz_to_xyz_wlock_drop_y};
use hdrcal_instrument::{Colorimeter, PatternGenerator};
use hdrcal_lut::invert::inverse_lut;
use hdrcal_lut::ramp::bright_ramp;
use hdrcal_lut::synth::correction_luts_rgb;
use hdrcal_lut::RgbLut;
use hdrcal_math::Vec3;
use hdrcal_profile::{CorrectionProfile, ProfileStore};
use hdrcal_targets::{
    P3D65_TEST_COLORS_XY, SRGB_TEST_COLORS_XY, chromaticity_targets, white_calibration_target,
};
use hdrcal_transfer::pq;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// Noise floor (cd/m²) of the activated-black threshold.
const ACTIVATED_BLACK_MIN_DELTA: f64 = 0.0005;

/// Where a calibration run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// No run active.
    #[default]
    Idle,
    /// Waiting for the user to place the instrument.
    AwaitingPlacement,
    /// Measuring the uncorrected gamut patches.
    MeasuringGamutBefore,
    /// Measuring the gray-ramp PQ response.
    MeasuringPqCurve,
    /// Measuring color patches and fitting the correction matrix.
    FittingChromaticity,
    /// Re-measuring the gamut for validation metadata.
    MeasuringGamutAfter,
    /// Run completed.
    Done,
    /// Run aborted.
    Failed,
}

/// Interactive confirmation points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPrompt {
    /// Ask the user to place the instrument on the white patch.
    PlaceInstrument,
    /// The instrument wants a white-reference calibration.
    CalibrateInstrument,
}

/// Callback answering a [`SessionPrompt`]; `false` cancels the run.
pub type PromptFn = Box<dyn FnMut(SessionPrompt) -> bool + Send>;

/// Cooperative cancellation flag checked before every blocking
/// measurement.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// One calibration run at a time, process-wide: the instrument pair is
// a single physical resource.
static RUN_ACTIVE: AtomicBool = AtomicBool::new(false);

// Preview profile names must not collide across sessions sharing a
// temp directory.
static NEXT_PREVIEW_ID: AtomicU64 = AtomicU64::new(1);

struct RunGuard;

impl RunGuard {
    fn acquire() -> Option<Self> {
        RUN_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        RUN_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Result of a completed calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    /// The final persisted profile.
    pub profile: CorrectionProfile,
    /// Gamut measured before any correction.
    pub gamut_before: GamutMeasurement,
    /// Gamut measured with the full correction active.
    pub gamut_after: GamutMeasurement,
}

/// One calibration run against one display.
///
/// Owns the instrument pair, the profile store, and the OS
/// color-directory handle for the duration of the run; [`run`] is the
/// only entry point and the only place cleanup happens.
///
/// [`run`]: CalibrationSession::run
pub struct CalibrationSession {
    config: CalibrationConfig,
    pattern: Box<dyn PatternGenerator>,
    meter: Box<dyn Colorimeter>,
    store: Box<dyn ProfileStore>,
    directory: Box<dyn ColorDirectory>,
    prompt: Option<PromptFn>,
    cancel: CancelToken,
    profile: CorrectionProfile,
    gamut: Option<GamutMeasurement>,
    preview_name: Option<String>,
    stage: Stage,
}

impl CalibrationSession {
    /// Builds a session around its collaborators.
    ///
    /// Reads the working profile from the store; a placeholder record
    /// (2-entry LUTs) is expanded to identity ramps so the first
    /// preview shows the uncorrected panel.
    pub fn new(
        config: CalibrationConfig,
        pattern: Box<dyn PatternGenerator>,
        meter: Box<dyn Colorimeter>,
        store: Box<dyn ProfileStore>,
        directory: Box<dyn ColorDirectory>,
    ) -> CalibrationResult<Self> {
        let mut profile = store.read()?;
        if profile.entry_count == 2 {
            let fresh = CorrectionProfile::identity(config.lut_entries);
            profile.set_luts(fresh.red_lut, fresh.green_lut, fresh.blue_lut);
        }
        Ok(Self {
            config,
            pattern,
            meter,
            store,
            directory,
            prompt: None,
            cancel: CancelToken::new(),
            profile,
            gamut: None,
            preview_name: None,
            stage: Stage::Idle,
        })
    }

    /// Installs the interactive confirmation callback.
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Token to cancel this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current stage, for progress reporting.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs the full calibration sequence.
    ///
    /// Whatever happens inside the stages, the instruments are shut
    /// down and the preview profile removed before this returns; the
    /// persisted profile is left at its last successfully written
    /// state.
    pub fn run(&mut self) -> CalibrationResult<CalibrationOutcome> {
        let guard = RunGuard::acquire();
        let result = if guard.is_none() {
            Err(CalibrationError::AlreadyRunning)
        } else if !self.config.display.hdr_active {
            Err(CalibrationError::HdrInactive(self.config.display.name.clone()))
        } else {
            info!(display = %self.config.display.name, "starting calibration");
            self.run_stages()
        };
        // Entry-guard failures release the instruments too; the session
        // owns already-spawned processes
        self.cleanup();
        match &result {
            Ok(_) => {
                self.stage = Stage::Done;
                info!("calibration finished");
            }
            Err(CalibrationError::Cancelled) => {
                self.stage = Stage::Idle;
                info!("calibration cancelled");
            }
            Err(e) => {
                self.stage = Stage::Failed;
                error!("calibration failed: {e}");
            }
        }
        result
    }

    fn run_stages(&mut self) -> CalibrationResult<CalibrationOutcome> {
        self.stage = Stage::AwaitingPlacement;
        // Bright placement patch so the user can line the meter up
        let placement = (self.max_code() as f64 * 800.0 / 1023.0).round() as u32;
        self.pattern.display([placement; 3])?;
        self.confirm(SessionPrompt::PlaceInstrument)?;

        while self.meter.needs_calibration() {
            info!("instrument requests a white-reference calibration");
            self.confirm(SessionPrompt::CalibrateInstrument)?;
            self.meter.calibrate()?;
        }

        let before = self.measure_gamut_before()?;
        self.gamut = Some(before.clone());
        self.calibrate_pq()?;
        self.calibrate_chromaticity()?;
        let after = self.measure_gamut_after()?;

        Ok(CalibrationOutcome {
            profile: self.profile.clone(),
            gamut_before: before,
            gamut_after: after,
        })
    }

    // ------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------

    /// Measures the six gamut patches, locates the activated black,
    /// and seeds the profile's luminance metadata.
    fn measure_gamut_before(&mut self) -> CalibrationResult<GamutMeasurement> {
        self.stage = Stage::MeasuringGamutBefore;
        self.refresh_preview()?;
        let [red, green, blue, white, white_200nit, black] = self.measure_patches()?;

        // Activated black: the lowest 8-bit gray code with a
        // measurable luminance rise over true black. OLED and
        // mini-LED panels often render the first few codes
        // indistinguishably from black.
        let start_y = black.y;
        let delta = (start_y * 0.01).max(ACTIVATED_BLACK_MIN_DELTA);
        info!(start_y, delta, "searching for activated black");
        let high = self.measure_gray_code(255)?;
        let min_activated_black = if high.y <= start_y + delta {
            info!("no rise within the 8-bit gray range, keeping black as activated black");
            black
        } else {
            let (mut lo, mut hi) = (1u32, 255u32);
            let mut found: Option<(u32, Vec3)> = None;
            while lo <= hi {
                let mid = (lo + hi) / 2;
                let xyz = self.measure_gray_code(mid)?;
                if xyz.y > start_y + delta {
                    found = Some((mid, xyz));
                    hi = mid - 1;
                } else {
                    lo = mid + 1;
                }
            }
            match found {
                Some((code, xyz)) => {
                    info!(code, y = xyz.y, "activated black");
                    xyz
                }
                None => {
                    warn!("bisection lost the threshold (noisy readings), keeping black");
                    black
                }
            }
        };

        let gamut = GamutMeasurement {
            red,
            green,
            blue,
            white,
            white_200nit,
            black,
            min_activated_black,
        };
        self.write_luminance_metadata(white.y, black.y, &gamut)?;
        info!("gamut measurement complete");
        Ok(gamut)
    }

    /// Samples the gray ramp, converts readings to device PQ RGB, and
    /// synthesizes the per-channel correction LUTs.
    fn calibrate_pq(&mut self) -> CalibrationResult<()> {
        self.stage = Stage::MeasuringPqCurve;
        self.refresh_preview()?;
        info!("measuring PQ grayscale response");

        let n = self.config.pq_points_clamped();
        let max_code = self.max_code();
        let mut red = Vec::with_capacity(n);
        let mut green = Vec::with_capacity(n);
        let mut blue = Vec::with_capacity(n);
        for i in 0..n {
            let code = (i as f64 * max_code as f64 / (n - 1) as f64).round() as u32;
            let xyz = self.show_and_measure([code; 3], self.config.ramp_settle)?;
            let rgb_pq = bt2020::xyz_to_pq_rgb(xyz / pq::L_MAX);
            info!(
                sample = i + 1,
                total = n,
                code,
                nits = xyz.y,
                "PQ ramp sample"
            );
            red.push(rgb_pq[0]);
            green.push(rgb_pq[1]);
            blue.push(rgb_pq[2]);
        }

        let entries = self.config.lut_entries;
        let targets = if self.config.bright_mode {
            RgbLut::new(bright_ramp(entries), bright_ramp(entries), bright_ramp(entries))?
        } else {
            RgbLut::new(
                self.profile.red_lut.clone(),
                self.profile.green_lut.clone(),
                self.profile.blue_lut.clone(),
            )?
        };
        let luts = correction_luts_rgb(&red, &green, &blue, &targets)?;
        self.profile.set_luts(luts.red, luts.green, luts.blue);
        self.store.write(&self.profile)?;
        info!("PQ correction LUTs synthesized");
        Ok(())
    }

    /// Measures the chromaticity test suite and fits the white-locked
    /// correction matrix, composing it onto the existing one.
    fn calibrate_chromaticity(&mut self) -> CalibrationResult<()> {
        self.stage = Stage::FittingChromaticity;
        self.refresh_preview()?;
        info!("measuring color patches for the matrix fit");

        let gamut = self
            .gamut
            .clone()
            .ok_or(CalibrationError::StageOrder(
                "chromaticity fit requires a prior gamut measurement",
            ))?;
        let device = gamut.primaries();
        let anchor = white_calibration_target(gamut.white.y);

        let mut targets = chromaticity_targets(&device, anchor, SRGB_TEST_COLORS_XY)?;
        if self.config.color_space == TargetColorSpace::SrgbAndDisplayP3 {
            targets.extend(chromaticity_targets(&device, anchor, P3D65_TEST_COLORS_XY)?);
        }
        // The white anchor goes last; it doubles as the lock point
        targets.push(anchor);

        let max_code = self.max_code() as f64;
        let total = targets.len();
        let mut measured = Vec::with_capacity(total);
        for (i, target) in targets.iter().enumerate() {
            let pq_rgb = bt2020::xyz_to_pq_rgb(*target);
            let rgb = [
                (pq_rgb[0] * max_code).round() as u32,
                (pq_rgb[1] * max_code).round() as u32,
                (pq_rgb[2] * max_code).round() as u32,
            ];
            let xyz = self.show_and_measure(rgb, self.config.patch_settle)? / pq::L_MAX;
            info!(sample = i + 1, total, ?rgb, measured_y = xyz.y, "color patch");
            measured.push(xyz);
        }

        let wm = *measured
            .last()
            .ok_or(CalibrationError::StageOrder("no chromaticity samples measured"))?;
        let wt = *targets
            .last()
            .ok_or(CalibrationError::StageOrder("no chromaticity targets generated"))?;
        let fitted =
            fit_xyz_to_xyz_wlock_drop_y(&measured, &targets, wm, wt, &FitOptions::default())?;

        let composed = self.profile.matrix() * fitted;
        self.profile.set_matrix(composed);
        self.store.write(&self.profile)?;
        info!(matrix = ?self.profile.matrix, "chromaticity correction fitted");
        Ok(())
    }

    /// Re-measures the gamut with the full correction active and
    /// finalizes the luminance metadata.
    fn measure_gamut_after(&mut self) -> CalibrationResult<GamutMeasurement> {
        self.stage = Stage::MeasuringGamutAfter;
        self.refresh_preview()?;
        let [red, green, blue, white, white_200nit, black] = self.measure_patches()?;

        let mut max_lumi = white.y;
        let mut min_lumi = black.y;
        if self.config.bright_mode {
            // The bright offset lives in the LUTs; undo it on the
            // measured endpoints so the metadata reflects what content
            // authored without the boost will see
            let inv = inverse_lut(&bright_ramp(self.config.lut_entries))?;
            let lut = RgbLut::new(inv.clone(), inv.clone(), inv)?;
            let white_fix =
                bt2020::pq_rgb_to_xyz(lut.apply(bt2020::xyz_to_pq_rgb(white / pq::L_MAX)));
            let black_fix =
                bt2020::pq_rgb_to_xyz(lut.apply(bt2020::xyz_to_pq_rgb(black / pq::L_MAX)));
            info!(white_y = white_fix.y, black_y = black_fix.y, "bright-mode adjusted endpoints");
            max_lumi = white_fix.y * pq::L_MAX;
            min_lumi = black_fix.y * pq::L_MAX;
        }

        let min_activated_black = self
            .gamut
            .as_ref()
            .map(|g| g.min_activated_black)
            .unwrap_or(black);
        let gamut = GamutMeasurement {
            red,
            green,
            blue,
            white,
            white_200nit,
            black,
            min_activated_black,
        };
        self.write_luminance_metadata(max_lumi, min_lumi, &gamut)?;
        info!("post-calibration gamut measurement complete");
        Ok(gamut)
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn max_code(&self) -> u32 {
        self.pattern.mode().max_code()
    }

    fn confirm(&mut self, prompt: SessionPrompt) -> CalibrationResult<()> {
        self.check_cancel()?;
        if let Some(cb) = &mut self.prompt {
            if !cb(prompt) {
                return Err(CalibrationError::Cancelled);
            }
        }
        Ok(())
    }

    fn check_cancel(&self) -> CalibrationResult<()> {
        if self.cancel.is_cancelled() {
            Err(CalibrationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Shows a patch, waits the settle delay, reads XYZ (cd/m²).
    ///
    /// The settle delay is a physical requirement (panel temporal
    /// processing), not tunable latency.
    fn show_and_measure(
        &mut self,
        rgb: [u32; 3],
        settle: std::time::Duration,
    ) -> CalibrationResult<Vec3> {
        self.check_cancel()?;
        self.pattern.display(rgb)?;
        std::thread::sleep(settle);
        Ok(self.meter.measure()?)
    }

    fn measure_patches(&mut self) -> CalibrationResult<[Vec3; 6]> {
        let mut out = [Vec3::ZERO; 6];
        for (slot, (name, rgb)) in out.iter_mut().zip(GAMUT_PATCHES) {
            let xyz = self.show_and_measure(*rgb, self.config.patch_settle)?;
            info!(patch = *name, x = xyz.x, y = xyz.y, z = xyz.z, "gamut patch");
            *slot = xyz;
        }
        Ok(out)
    }

    fn measure_gray_code(&mut self, code: u32) -> CalibrationResult<Vec3> {
        let xyz = self.show_and_measure([code; 3], self.config.patch_settle)?;
        debug!(code, y = xyz.y, "gray probe");
        Ok(xyz)
    }

    /// Writes peak/min luminance and logs the colorant directions the
    /// profile container carries alongside the record.
    fn write_luminance_metadata(
        &mut self,
        peak: f64,
        min: f64,
        gamut: &GamutMeasurement,
    ) -> CalibrationResult<()> {
        info!(peak, min, "writing luminance metadata");
        self.profile.peak_luminance = peak;
        self.profile.min_luminance = min;
        debug!(
            r = ?l2_normalize(gamut.red).to_array(),
            g = ?l2_normalize(gamut.green).to_array(),
            b = ?l2_normalize(gamut.blue).to_array(),
            w = ?l2_normalize(gamut.white_200nit).to_array(),
            "colorant directions"
        );
        self.store.write(&self.profile)?;
        Ok(())
    }

    /// Reinstalls the working profile as the display's live preview.
    ///
    /// Subsequent measurements see the panel through this profile, so
    /// each stage's correction compounds on the previous ones.
    fn refresh_preview(&mut self) -> CalibrationResult<()> {
        self.check_cancel()?;
        if let Some(name) = self.preview_name.take() {
            self.directory
                .remove_association(&name, &self.config.display.id, true)?;
            std::thread::sleep(self.config.preview_settle);
        }
        let id = NEXT_PREVIEW_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("CC_{}_{}", std::process::id(), id);
        let path = std::env::temp_dir().join(format!("{name}.yaml"));
        self.store.write(&self.profile)?;
        self.store.save(&path)?;
        self.directory
            .install_and_associate(&path, &self.config.display.id, true, true)?;
        let _ = std::fs::remove_file(&path);
        self.preview_name = Some(name);
        std::thread::sleep(self.config.preview_settle);
        Ok(())
    }

    /// The single cleanup path: stop both instruments, drop the
    /// preview. Runs on success, failure, and cancellation; never
    /// masks the stage error.
    fn cleanup(&mut self) {
        if let Err(e) = self.pattern.shutdown() {
            error!("pattern generator cleanup failed: {e}");
        }
        if let Err(e) = self.meter.shutdown() {
            error!("meter reader cleanup failed: {e}");
        }
        if let Some(name) = self.preview_name.take() {
            if let Err(e) =
                self.directory
                    .remove_association(&name, &self.config.display.id, true)
            {
                error!("preview removal failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayInfo, NullColorDirectory};
    use hdrcal_instrument::{InstrumentResult, PatternMode};
    use hdrcal_profile::MemoryProfileStore;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Panel stub with a hard luminance step at a configurable gray
    /// code: codes below it read as black, codes at or above it rise
    /// linearly.
    #[derive(Clone)]
    struct StepPanel {
        state: Arc<Mutex<[u32; 3]>>,
        step_code: u32,
    }

    impl StepPanel {
        fn new(step_code: u32) -> Self {
            Self {
                state: Arc::new(Mutex::new([0; 3])),
                step_code,
            }
        }

        fn luminance(&self) -> f64 {
            let rgb = *self.state.lock().unwrap();
            let code = rgb.iter().copied().max().unwrap_or(0);
            if code < self.step_code {
                0.05
            } else {
                0.05 + 0.01 * code as f64
            }
        }
    }

    impl PatternGenerator for StepPanel {
        fn display(&mut self, rgb: [u32; 3]) -> InstrumentResult<()> {
            *self.state.lock().unwrap() = rgb;
            Ok(())
        }

        fn mode(&self) -> PatternMode {
            PatternMode::Hdr10
        }

        fn shutdown(&mut self) -> InstrumentResult<()> {
            Ok(())
        }
    }

    impl Colorimeter for StepPanel {
        fn measure(&mut self) -> InstrumentResult<Vec3> {
            let y = self.luminance();
            Ok(Vec3::new(y * 0.9, y, y * 1.1))
        }

        fn shutdown(&mut self) -> InstrumentResult<()> {
            Ok(())
        }
    }

    fn step_session(step_code: u32) -> (CalibrationSession, StepPanel) {
        let panel = StepPanel::new(step_code);
        let mut config = CalibrationConfig::new(DisplayInfo {
            id: "STUB".into(),
            name: "stub".into(),
            hdr_active: true,
        });
        config.patch_settle = Duration::ZERO;
        config.preview_settle = Duration::ZERO;
        let session = CalibrationSession::new(
            config,
            Box::new(panel.clone()),
            Box::new(panel.clone()),
            Box::new(MemoryProfileStore::new(CorrectionProfile::identity(4096))),
            Box::new(NullColorDirectory),
        )
        .unwrap();
        (session, panel)
    }

    #[test]
    fn test_activated_black_search_finds_step_code() {
        let (mut session, _) = step_session(37);
        let gamut = session.measure_gamut_before().unwrap();
        // The lowest code above the threshold is exactly the step;
        // its reading carries the step luminance
        let expected = 0.05 + 0.01 * 37.0;
        assert!(
            (gamut.min_activated_black.y - expected).abs() < 1e-12,
            "activated black at {}",
            gamut.min_activated_black.y
        );
    }

    #[test]
    fn test_activated_black_skipped_when_flat() {
        // Step above the 8-bit range: code 255 never clears the
        // threshold, black is kept
        let (mut session, _) = step_session(600);
        let gamut = session.measure_gamut_before().unwrap();
        assert_eq!(gamut.min_activated_black.y, gamut.black.y);
    }
}

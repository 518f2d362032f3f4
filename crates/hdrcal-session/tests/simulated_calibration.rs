//! End-to-end calibration against the simulated rig.
//!
//! Drives a full run on a deliberately miscalibrated synthetic panel
//! and checks the things a real calibration is judged by: the
//! synthesized LUTs are sane, the luminance metadata is plausible, and
//! the corrected panel lands measurably closer to its targets than the
//! uncorrected one.
//!
//! Everything runs inside one test function because the session
//! enforces one run at a time process-wide.

use hdrcal_color::{bt2020, deltae::delta_e_itp, xyz::xyy_to_xyz};
use hdrcal_instrument::sim::{SimulatedPanel, SimulatedRig};
use hdrcal_instrument::{Colorimeter, PatternGenerator};
use hdrcal_math::Vec3;
use hdrcal_profile::{CorrectionProfile, MemoryProfileStore};
use hdrcal_session::CalibrationError;
use hdrcal_session::config::{CalibrationConfig, TargetColorSpace};
use hdrcal_session::display::{DisplayInfo, SimulatedColorDirectory};
use hdrcal_session::session::CalibrationSession;
use std::time::Duration;

fn test_config(hdr_active: bool) -> CalibrationConfig {
    let mut config = CalibrationConfig::new(DisplayInfo {
        id: "SIM-0".into(),
        name: "simulated panel".into(),
        hdr_active,
    });
    // The simulated panel has no temporal processing to settle
    config.patch_settle = Duration::ZERO;
    config.ramp_settle = Duration::ZERO;
    config.preview_settle = Duration::ZERO;
    config.pq_points = 64;
    config.color_space = TargetColorSpace::Srgb;
    config
}

fn build_session(rig: &SimulatedRig, config: CalibrationConfig) -> CalibrationSession {
    let (pattern, meter) = rig.split();
    CalibrationSession::new(
        config,
        Box::new(pattern),
        Box::new(meter),
        Box::new(MemoryProfileStore::new(CorrectionProfile::identity(4096))),
        Box::new(SimulatedColorDirectory::new(rig.profile_handle())),
    )
    .unwrap()
}

/// Average ΔE_ITP of gray + color patches on the rig as it currently
/// stands (profile applied or not).
fn rate_panel(rig: &SimulatedRig) -> f64 {
    let (mut pattern, mut meter) = rig.split();
    let mut patches: Vec<Vec3> = (1..=8)
        .map(|i| xyy_to_xyz(0.3127, 0.3290, 400.0 * i as f64 / 8.0))
        .collect();
    for (x, y) in [(0.389, 0.365), (0.322, 0.510), (0.235, 0.263), (0.577, 0.322)] {
        patches.push(xyy_to_xyz(x, y, 80.0));
    }

    let mut total = 0.0;
    for target in &patches {
        let pq_rgb = bt2020::xyz_to_pq_rgb(*target);
        let rgb = [
            (pq_rgb[0] * 1023.0).round() as u32,
            (pq_rgb[1] * 1023.0).round() as u32,
            (pq_rgb[2] * 1023.0).round() as u32,
        ];
        pattern.display(rgb).unwrap();
        let measured = meter.measure().unwrap() / 10000.0;
        total += delta_e_itp(*target, measured);
    }
    total / patches.len() as f64
}

#[test]
fn full_simulated_calibration() {
    // --- entry guard -------------------------------------------------
    let rig = SimulatedRig::new(SimulatedPanel::default());
    let mut sdr_session = build_session(&rig, test_config(false));
    assert!(matches!(
        sdr_session.run(),
        Err(CalibrationError::HdrInactive(_))
    ));

    // --- cancellation before the first stage -------------------------
    let rig = SimulatedRig::new(SimulatedPanel::default());
    let mut cancelled = build_session(&rig, test_config(true));
    cancelled.cancel_token().cancel();
    assert!(matches!(cancelled.run(), Err(CalibrationError::Cancelled)));
    // Nothing was installed on the simulated pipeline
    assert!(rate_panel(&rig) > 0.0);

    // --- the real run ------------------------------------------------
    let rig = SimulatedRig::new(SimulatedPanel::default());
    let before_de = rate_panel(&rig);
    assert!(
        before_de > 1.0,
        "the default panel should start out visibly wrong, ΔE={before_de}"
    );

    let mut session = build_session(&rig, test_config(true));
    let outcome = session.run().expect("calibration run");
    let profile = &outcome.profile;

    // LUT shape: full-length, in range, essentially monotonic
    assert_eq!(profile.entry_count, 4096);
    for lut in [&profile.red_lut, &profile.green_lut, &profile.blue_lut] {
        assert_eq!(lut.len(), 4096);
        assert!(lut.iter().all(|v| (0.0..=1.0).contains(v)));
        let decreases = lut.windows(2).filter(|w| w[1] < w[0]).count();
        assert_eq!(decreases, 0, "synthesized LUT must be monotonic on clean data");
    }

    // Luminance metadata tracks the 800-nit simulated panel
    assert!(
        (600.0..1000.0).contains(&profile.peak_luminance),
        "peak {}",
        profile.peak_luminance
    );
    assert!(profile.min_luminance < 1.0);

    // Gamut records are ordered sanely
    assert!(outcome.gamut_before.white.y > outcome.gamut_before.white_200nit.y);
    assert!(outcome.gamut_before.black.y < 1.0);
    assert!(outcome.gamut_before.min_activated_black.y >= outcome.gamut_before.black.y);

    // The session's cleanup removed the preview; reinstall the final
    // profile the way the OS would after `save` + install
    rig.profile_handle().set_active(Some(profile.clone()));
    let after_de = rate_panel(&rig);
    assert!(
        after_de < before_de * 0.5,
        "correction should at least halve the average error: {before_de} -> {after_de}"
    );

    // --- the run guard releases, a second run works ------------------
    let rig2 = SimulatedRig::new(SimulatedPanel::default());
    let mut again = build_session(&rig2, test_config(true));
    again.run().expect("second sequential run");
}

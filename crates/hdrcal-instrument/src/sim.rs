//! Deterministic simulated display + meter rig.
//!
//! Models a miscalibrated HDR panel well enough to exercise the whole
//! calibration loop without hardware: a native gamut that is not quite
//! BT.2020, a per-channel PQ-domain response distortion, and a black
//! floor. An active correction profile can be fed back into the model
//! the way the OS color pipeline would, so successive calibration
//! stages measure the panel *as corrected so far*.

use crate::{Colorimeter, InstrumentResult, PatternGenerator, PatternMode};
use hdrcal_lut::RgbLut;
use hdrcal_math::{Mat3, Vec3};
use hdrcal_primaries::{D65_XY, Primaries, rgb_to_xyz_matrix};
use hdrcal_profile::CorrectionProfile;
use hdrcal_transfer::pq;
use std::sync::{Arc, Mutex};

/// Panel model parameters.
#[derive(Debug, Clone)]
pub struct SimulatedPanel {
    /// Native linear RGB -> XYZ basis, normalized (white Y = peak/10000).
    pub basis: Mat3,
    /// Per-channel exponent applied to the PQ signal (1.0 = faithful).
    pub response_power: [f64; 3],
    /// Black floor in normalized XYZ.
    pub black: Vec3,
    /// Pattern code range the panel accepts.
    pub mode: PatternMode,
}

impl Default for SimulatedPanel {
    /// A plausible wide-gamut panel: ~P3-ish native primaries driven
    /// with a BT.2020 signal, 800-nit peak, mild per-channel gamma
    /// error, 0.05-nit black floor.
    fn default() -> Self {
        let native = Primaries {
            r: (0.675, 0.310),
            g: (0.212, 0.715),
            b: (0.145, 0.052),
            w: D65_XY,
            name: "simulated panel",
        };
        let basis = rgb_to_xyz_matrix(&native).expect("static primaries") * (800.0 / pq::L_MAX);
        Self {
            basis,
            response_power: [1.04, 0.97, 1.06],
            black: Vec3::new(4.4e-6, 4.6e-6, 6.5e-6),
            mode: PatternMode::Hdr10,
        }
    }
}

struct SimState {
    panel: SimulatedPanel,
    rgb: [u32; 3],
    active: Option<CorrectionProfile>,
}

/// Shared simulated rig; [`SimulatedRig::split`] yields the two
/// instrument handles, [`SimulatedRig::profile_handle`] the feedback
/// hook standing in for the OS color pipeline.
#[derive(Clone)]
pub struct SimulatedRig {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRig {
    /// Creates a rig around the given panel model.
    pub fn new(panel: SimulatedPanel) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                panel,
                rgb: [0, 0, 0],
                active: None,
            })),
        }
    }

    /// Splits the rig into pattern-generator and colorimeter handles.
    pub fn split(&self) -> (SimulatedPattern, SimulatedMeter) {
        (
            SimulatedPattern { rig: self.clone() },
            SimulatedMeter { rig: self.clone() },
        )
    }

    /// Handle for installing/removing the active correction profile.
    pub fn profile_handle(&self) -> SimProfileHandle {
        SimProfileHandle { rig: self.clone() }
    }

    /// Computes the XYZ (cd/m²) currently leaving the panel.
    fn measure_current(&self) -> Vec3 {
        let state = self.state.lock().expect("sim state poisoned");
        let max_code = state.panel.mode.max_code() as f64;
        let mut signal = [
            state.rgb[0] as f64 / max_code,
            state.rgb[1] as f64 / max_code,
            state.rgb[2] as f64 / max_code,
        ];

        // Correction LUTs ahead of the panel, like the pipeline's
        // per-channel 1D tables
        if let Some(profile) = &state.active {
            if let Ok(lut) = RgbLut::new(
                profile.red_lut.clone(),
                profile.green_lut.clone(),
                profile.blue_lut.clone(),
            ) {
                signal = lut.apply(signal);
            }
        }

        // Panel response: per-channel PQ-domain distortion, then the
        // native gamut basis and black floor
        let lin = Vec3::new(
            pq::decode(signal[0].powf(state.panel.response_power[0])),
            pq::decode(signal[1].powf(state.panel.response_power[1])),
            pq::decode(signal[2].powf(state.panel.response_power[2])),
        );
        let mut xyz = state.panel.basis * lin + state.panel.black;

        // Correction matrix, as the color pipeline applies it
        if let Some(profile) = &state.active {
            xyz = profile.matrix() * xyz;
        }
        xyz * pq::L_MAX
    }
}

/// Pattern-generator handle of a [`SimulatedRig`].
pub struct SimulatedPattern {
    rig: SimulatedRig,
}

impl PatternGenerator for SimulatedPattern {
    fn display(&mut self, rgb: [u32; 3]) -> InstrumentResult<()> {
        self.rig.state.lock().expect("sim state poisoned").rgb = rgb;
        Ok(())
    }

    fn mode(&self) -> PatternMode {
        self.rig.state.lock().expect("sim state poisoned").panel.mode
    }

    fn shutdown(&mut self) -> InstrumentResult<()> {
        Ok(())
    }
}

/// Colorimeter handle of a [`SimulatedRig`].
pub struct SimulatedMeter {
    rig: SimulatedRig,
}

impl Colorimeter for SimulatedMeter {
    fn measure(&mut self) -> InstrumentResult<Vec3> {
        Ok(self.rig.measure_current())
    }

    fn shutdown(&mut self) -> InstrumentResult<()> {
        Ok(())
    }
}

/// Installs/removes the active correction profile on the simulated
/// pipeline, standing in for the OS color-management calls.
#[derive(Clone)]
pub struct SimProfileHandle {
    rig: SimulatedRig,
}

impl SimProfileHandle {
    /// Sets (or clears) the profile the pipeline applies.
    pub fn set_active(&self, profile: Option<CorrectionProfile>) {
        self.rig.state.lock().expect("sim state poisoned").active = profile;
    }
}

//! # hdrcal-instrument
//!
//! Clients for the two physical collaborators of a calibration run:
//! the test-pattern generator (drives the panel) and the colorimeter
//! reader (returns XYZ). Both are external programs spoken to over a
//! line-oriented text protocol on stdio; all of that fragility is
//! isolated behind the [`PatternGenerator`] and [`Colorimeter`]
//! traits.
//!
//! The instrument pair is a single shared stateful resource: one
//! physical meter, one pattern window. Operations are strictly
//! ordered (write, then blocking read with a deadline) and never
//! pipelined; a missed deadline raises
//! [`InstrumentError::Timeout`] instead of hanging the run.
//!
//! # Modules
//!
//! - [`process`] - subprocess-backed clients
//! - [`proto`] - response-line parsing
//! - [`sim`] - deterministic simulated display + meter rig
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_instrument::sim::{SimulatedPanel, SimulatedRig};
//! use hdrcal_instrument::{Colorimeter, PatternGenerator};
//!
//! let rig = SimulatedRig::new(SimulatedPanel::default());
//! let (mut pattern, mut meter) = rig.split();
//! pattern.display([512, 512, 512]).unwrap();
//! let xyz = meter.measure().unwrap();
//! assert!(xyz.y > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod process;
pub mod proto;
pub mod sim;

pub use error::*;

use hdrcal_math::Vec3;

/// RGB code range of the pattern generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMode {
    /// 10-bit HDR, codes 0-1023.
    #[default]
    Hdr10,
    /// 8-bit HDR, codes 0-255.
    Hdr8,
    /// 10-bit SDR, codes 0-1023.
    Sdr10,
    /// 8-bit SDR, codes 0-255.
    Sdr8,
}

impl PatternMode {
    /// Maximum per-channel code for this mode.
    #[inline]
    pub fn max_code(self) -> u32 {
        match self {
            Self::Hdr10 | Self::Sdr10 => 1023,
            Self::Hdr8 | Self::Sdr8 => 255,
        }
    }

    /// The mode line sent to the pattern-generator process.
    pub fn command(self) -> &'static str {
        match self {
            Self::Hdr10 => "mode 10_hdr",
            Self::Hdr8 => "mode 8_hdr",
            Self::Sdr10 => "mode 10",
            Self::Sdr8 => "mode 8",
        }
    }
}

/// Drives the test-pattern window.
pub trait PatternGenerator {
    /// Shows an RGB patch (component range per [`PatternMode`]).
    ///
    /// Returns once the generator acknowledges the patch; the caller
    /// adds whatever settle delay the measurement needs.
    fn display(&mut self, rgb: [u32; 3]) -> InstrumentResult<()>;

    /// Code range of this generator.
    fn mode(&self) -> PatternMode;

    /// Stops the generator process/window.
    ///
    /// Must be safe to call more than once; cleanup paths call it
    /// unconditionally.
    fn shutdown(&mut self) -> InstrumentResult<()>;
}

/// Reads XYZ from the colorimeter.
pub trait Colorimeter {
    /// Blocks until a reading completes and returns absolute XYZ
    /// (cd/m²), or times out.
    fn measure(&mut self) -> InstrumentResult<Vec3>;

    /// True when the instrument reports it needs a white-reference
    /// calibration before further readings are valid.
    fn needs_calibration(&self) -> bool {
        false
    }

    /// Runs the instrument's own calibration routine.
    fn calibrate(&mut self) -> InstrumentResult<()> {
        Ok(())
    }

    /// Stops the reader process.
    ///
    /// Must be safe to call more than once.
    fn shutdown(&mut self) -> InstrumentResult<()>;
}

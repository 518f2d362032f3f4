//! # hdrcal-lut
//!
//! Corrective 1D lookup-table synthesis for display calibration.
//!
//! The central problem: given a sparse, noisy measurement of a
//! display's PQ response (input code -> output code), build a dense
//! monotonic table such that feeding the table's output through the
//! real display approximates the ideal target curve. The synthesis
//! approximates the measured curve's functional inverse by repairing
//! monotonicity, oversampling the curve, and nearest-index searching
//! it for every target code.
//!
//! # Modules
//!
//! - [`ramp`] - identity/bright ramps and the nearest-index [`RgbLut`]
//! - [`synth`] - measurement repair, oversampling, corrective LUT synthesis
//! - [`invert`] - functional inversion of an existing LUT
//! - [`eetf`] - the BT.2390 tone-mapping knee
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_lut::synth::correction_lut_from_measured;
//!
//! // A perfectly linear panel needs an identity correction
//! let measured: Vec<f64> = (0..128).map(|i| i as f64 / 127.0).collect();
//! let lut = correction_lut_from_measured(&measured, None).unwrap();
//! assert_eq!(lut.len(), 4096);
//! assert!((lut[2048] - 2048.0 / 4095.0).abs() < 1.0 / 4095.0);
//! ```
//!
//! # Dependencies
//!
//! - [`hdrcal-transfer`] - PQ curves for the EETF
//! - [`rayon`] - per-channel synthesis parallelism
//! - [`tracing`] - data-quality warnings

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod eetf;
pub mod invert;
pub mod ramp;
pub mod synth;

pub use error::*;
pub use ramp::RgbLut;

/// Default synthesized LUT length (hardware table size).
pub const DEFAULT_LUT_LEN: usize = 4096;

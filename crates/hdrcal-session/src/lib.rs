//! # hdrcal-session
//!
//! The calibration orchestration layer: a strictly sequential state
//! machine that drives the instrument pair through gamut measurement,
//! PQ-curve measurement, chromaticity fitting, and validation, feeding
//! the results into the correction profile after every sub-stage.
//!
//! # Stage sequence
//!
//! ```text
//! idle -> awaiting placement -> measuring gamut (before)
//!      -> measuring PQ curve -> fitting chromaticity
//!      -> measuring gamut (after) -> done | failed
//! ```
//!
//! Every sub-stage runs with the live preview enabled: the current
//! profile is installed on the display before measuring, so each stage
//! measures the panel *as corrected so far* and its correction
//! compounds on the previous one.
//!
//! Error handling follows one rule: stages return `Result` and never
//! clean up; [`session::CalibrationSession::run`] owns the single
//! cleanup path that stops the instruments and removes the preview
//! profile on success, failure, and cancellation alike.
//!
//! # Modules
//!
//! - [`config`] - run parameters
//! - [`display`] - OS color-directory boundary
//! - [`gamut`] - gamut patch table and measurement record
//! - [`session`] - the calibration state machine
//! - [`verify`] - post-calibration response/accuracy sweep

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod display;
mod error;
pub mod gamut;
pub mod session;
pub mod verify;

pub use error::*;

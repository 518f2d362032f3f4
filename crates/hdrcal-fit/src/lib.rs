//! # hdrcal-fit
//!
//! Least-squares fitting of 3x3 XYZ-correction matrices from paired
//! (measured, target) samples.
//!
//! Four fit variants cover the calibration flows:
//!
//! - [`fit_xyz_to_xyz`] - plain least squares
//! - [`fit_xyz_to_xyz_wlock`] - hard white-point equality constraint
//! - [`fit_xyz_to_xyz_drop_y`] - chromaticity only, luminance discarded
//! - [`fit_xyz_to_xyz_wlock_drop_y`] - both of the above
//!
//! The white lock is a KKT (Lagrange multiplier) equality constraint,
//! not a heavy weight: the fitted matrix reproduces the white point
//! *exactly* while staying least-squares optimal elsewhere. Neutral
//! gray accuracy is worth more than a marginal RMS reduction on
//! saturated patches.
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_fit::{FitOptions, fit_xyz_to_xyz_wlock};
//! use hdrcal_math::{Mat3, Vec3};
//!
//! let truth = Mat3::from_rows([[1.1, 0.02, 0.0], [0.01, 0.95, 0.0], [0.0, 0.03, 1.05]]);
//! let measured: Vec<Vec3> = (0..8)
//!     .map(|i| Vec3::new(0.1 + i as f64 * 0.07, 0.2 + i as f64 * 0.05, 0.3 + (i % 3) as f64 * 0.1))
//!     .collect();
//! let target: Vec<Vec3> = measured.iter().map(|&m| truth * m).collect();
//!
//! let wm = measured[7];
//! let wt = target[7];
//! let c = fit_xyz_to_xyz_wlock(&measured, &target, wm, wt, &FitOptions::default()).unwrap();
//! let locked = c * wm;
//! assert!((locked.x - wt.x).abs() < 1e-9);
//! ```
//!
//! # Dependencies
//!
//! - [`hdrcal-math`] - dense solves for the 9x9 / 12x12 systems
//! - [`hdrcal-color`] - chromaticity projection for the drop-Y variants

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod fit;

pub use error::*;
pub use fit::*;

//! # hdrcal-math
//!
//! Math primitives for display-calibration pipelines.
//!
//! This crate provides the numeric foundation shared by every other
//! calibration crate:
//!
//! - [`Vec3`] - f64 3-vectors for XYZ/RGB triples
//! - [`Mat3`] - row-major f64 3x3 matrices for color transforms
//! - [`solve_dense`] - small dense linear solves for the fitting code
//!
//! # Design
//!
//! All operations are `f64`. Calibration matrices are validated against
//! white-point equality constraints at ~1e-9, which is out of reach for
//! single precision. All matrix operations assume **row-major** storage
//! and **column vectors**:
//!
//! ```text
//! result = matrix * vector
//! ```
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_math::{Mat3, Vec3};
//!
//! let m = Mat3::diagonal(2.0, 2.0, 2.0);
//! let v = Vec3::new(1.0, 2.0, 3.0);
//! assert_eq!(m * v, Vec3::new(2.0, 4.0, 6.0));
//! ```
//!
//! # Dependencies
//!
//! - [`glam`] - `DVec3`/`DMat3` interop for callers that already use it
//!
//! # Used By
//!
//! - `hdrcal-color` - color space conversions
//! - `hdrcal-primaries` - gamut basis matrices
//! - `hdrcal-fit` - correction-matrix fitting

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod mat3;
mod solve;
mod vec3;

pub use mat3::*;
pub use solve::*;
pub use vec3::*;

//! # hdrcal-transfer
//!
//! Transfer functions (EOTF/OETF) for HDR display calibration.
//!
//! Every curve operates on `f64` and clamps its domain, because these
//! functions sit directly in measurement loops where a slightly
//! negative instrument reading or a >10,000 nit spike must not turn
//! into NaN inside a correction table.
//!
//! # Modules
//!
//! - [`pq`] - SMPTE ST 2084 Perceptual Quantizer
//! - [`srgb`] - IEC 61966-2-1 piecewise curve
//! - [`gamma`] - pure power-law curves
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_transfer::pq;
//!
//! let code = pq::oetf(100.0);        // 100 nits -> PQ code
//! let nits = pq::eotf(code);
//! assert!((nits - 100.0).abs() < 1e-6);
//! ```
//!
//! # Used By
//!
//! - `hdrcal-color` - PQ-encoded BT.2020 signal representation
//! - `hdrcal-lut` - corrective LUT synthesis targets
//! - `hdrcal-session` - converting measured luminance to PQ codes

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod gamma;
pub mod pq;
pub mod srgb;

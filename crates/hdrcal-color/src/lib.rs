//! # hdrcal-color
//!
//! Color space conversions and perceptual difference metrics.
//!
//! Everything in this crate is a pure function over the workspace-wide
//! XYZ convention: triples normalized so that **1.0 = 10,000 nits**
//! (the PQ reference peak), D65 white. Invalid inputs map to sentinel
//! values (a zero vector, or NaN chromaticities) instead of failing,
//! because these functions run inside batch measurement loops where a
//! single bad reading must not abort the sweep.
//!
//! # Modules
//!
//! - [`xyz`] - XYZ <-> xy <-> xyY projective conversions
//! - [`bt2020`] - BT.2020 linear and PQ-encoded RGB
//! - [`lab`] - white-relative CIELAB
//! - [`ictcp`] - BT.2100 ICtCp
//! - [`deltae`] - ΔE_ITP (BT.2124) and CIEDE2000
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_color::{bt2020, xyz};
//!
//! let white = xyz::xyy_to_xyz(0.3127, 0.3290, 1000.0);
//! let pq_rgb = bt2020::xyz_to_pq_rgb(white);
//! let back = bt2020::pq_rgb_to_xyz(pq_rgb);
//! assert!((back.y - white.y).abs() < 1e-6);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bt2020;
pub mod deltae;
pub mod ictcp;
pub mod lab;
pub mod xyz;

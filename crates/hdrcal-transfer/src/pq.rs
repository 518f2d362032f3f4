//! SMPTE ST 2084 Perceptual Quantizer (PQ) transfer function.
//!
//! PQ encodes absolute luminance up to 10,000 cd/m2 in a perceptually
//! uniform [0, 1] code. Two flavors are provided:
//!
//! - [`eotf`]/[`oetf`] work in absolute luminance (cd/m2), matching
//!   what a colorimeter reports.
//! - [`encode`]/[`decode`] work on normalized linear light where
//!   1.0 = 10,000 nits, matching the pipeline's XYZ normalization.
//!
//! # Reference
//!
//! SMPTE ST 2084:2014
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_transfer::pq;
//!
//! let signal = pq::oetf(203.0);      // HDR reference white
//! let nits = pq::eotf(signal);
//! assert!((nits - 203.0).abs() < 1e-6);
//! ```

/// Maximum luminance in cd/m2 (nits): the PQ reference peak.
pub const L_MAX: f64 = 10000.0;

// PQ constants from SMPTE ST 2084
const M1: f64 = 2610.0 / 16384.0;
const M2: f64 = 2523.0 / 32.0;
const C1: f64 = 3424.0 / 4096.0;
const C2: f64 = 2413.0 / 128.0;
const C3: f64 = 2392.0 / 128.0;

// Denominator guard; the PQ denominators cannot reach zero for clamped
// inputs but measurement code must never divide by ~0 regardless.
const EPSILON: f64 = 1e-10;

/// PQ EOTF: decodes a PQ code to absolute luminance (cd/m2).
///
/// The input is clamped to [0, 1] and the output to [0, 10000].
///
/// # Example
///
/// ```rust
/// use hdrcal_transfer::pq::eotf;
///
/// let nits = eotf(0.508);
/// assert!((nits - 100.0).abs() < 1.0);
/// ```
#[inline]
pub fn eotf(v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    let vp = v.powf(1.0 / M2);
    let num = (vp - C1).max(0.0);
    let den = (C2 - C3 * vp).max(EPSILON);
    (num / den).powf(1.0 / M1).clamp(0.0, 1.0) * L_MAX
}

/// PQ OETF: encodes absolute luminance (cd/m2) to a PQ code.
///
/// The input is clamped to [0, 10000] and the output to [0, 1].
///
/// # Example
///
/// ```rust
/// use hdrcal_transfer::pq::oetf;
///
/// let signal = oetf(100.0);
/// assert!((signal - 0.508).abs() < 0.01);
/// ```
#[inline]
pub fn oetf(l: f64) -> f64 {
    let l = (l / L_MAX).clamp(0.0, 1.0);
    let lm = l.powf(M1);
    let y = (C1 + C2 * lm) / (1.0 + C3 * lm).max(EPSILON);
    y.max(0.0).powf(M2).clamp(0.0, 1.0)
}

/// Encodes normalized linear light (1.0 = 10,000 nits) to a PQ code.
#[inline]
pub fn encode(linear: f64) -> f64 {
    let x = linear.clamp(0.0, 1.0);
    let xm = x.powf(M1);
    ((C1 + C2 * xm) / (1.0 + C3 * xm)).powf(M2)
}

/// Decodes a PQ code to normalized linear light (1.0 = 10,000 nits).
#[inline]
pub fn decode(v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    let vp = v.powf(1.0 / M2);
    let num = (vp - C1).max(0.0);
    let den = (C2 - C3 * vp).max(EPSILON);
    (num / den).powf(1.0 / M1).clamp(0.0, 1.0)
}

/// Applies [`encode`] to an RGB triple.
#[inline]
pub fn encode_rgb(rgb: [f64; 3]) -> [f64; 3] {
    [encode(rgb[0]), encode(rgb[1]), encode(rgb[2])]
}

/// Applies [`decode`] to an RGB triple.
#[inline]
pub fn decode_rgb(rgb: [f64; 3]) -> [f64; 3] {
    [decode(rgb[0]), decode(rgb[1]), decode(rgb[2])]
}

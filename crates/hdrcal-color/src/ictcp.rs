//! BT.2100 ICtCp color representation.
//!
//! Forward path only: XYZ -> linear BT.2020 RGB -> LMS -> PQ -> ICtCp.
//! Used by the ΔE_ITP metric; the matrices are the integer-ratio
//! constants from BT.2100 and are part of the external contract.

use crate::bt2020;
use hdrcal_math::{Mat3, Vec3};
use hdrcal_transfer::pq;

/// Linear BT.2020 RGB -> LMS (BT.2100 M1, divided by 4096).
pub const RGB_TO_LMS: Mat3 = Mat3::from_rows([
    [1688.0 / 4096.0, 2146.0 / 4096.0, 262.0 / 4096.0],
    [683.0 / 4096.0, 2951.0 / 4096.0, 462.0 / 4096.0],
    [99.0 / 4096.0, 309.0 / 4096.0, 3688.0 / 4096.0],
]);

/// PQ-encoded L'M'S' -> ICtCp (divided by 4096).
pub const LMS_P_TO_ICTCP: Mat3 = Mat3::from_rows([
    [2048.0 / 4096.0, 2048.0 / 4096.0, 0.0],
    [6610.0 / 4096.0, -13613.0 / 4096.0, 7003.0 / 4096.0],
    [17933.0 / 4096.0, -17390.0 / 4096.0, -543.0 / 4096.0],
]);

/// Converts normalized XYZ (1 = 10,000 nits) to ICtCp.
///
/// LMS is clamped non-negative before PQ encoding; out-of-gamut inputs
/// degrade gracefully instead of producing NaN.
///
/// # Example
///
/// ```rust
/// use hdrcal_color::{ictcp, xyz};
///
/// let w = xyz::xyy_to_xyz(0.3127, 0.3290, 1000.0);
/// let [i, t, p] = ictcp::xyz_to_ictcp(w);
/// // Neutral gray: chroma components near zero
/// assert!(t.abs() < 1e-3 && p.abs() < 1e-3);
/// assert!(i > 0.0);
/// ```
pub fn xyz_to_ictcp(xyz: Vec3) -> [f64; 3] {
    let rgb = bt2020::xyz_to_linear_rgb(xyz);
    let lms = (RGB_TO_LMS * rgb).max_scalar(0.0).clamp_scalar(0.0, 1.0);
    let lms_p = pq::encode_rgb(lms.to_array());
    (LMS_P_TO_ICTCP * Vec3::from_array(lms_p)).to_array()
}

//! BT.2020 linear RGB and the PQ-encoded HDR10 signal representation.
//!
//! The PQ-encoded BT.2020 RGB triple is the signal the display
//! actually receives; these matrices are part of the external contract
//! and must match the standard values exactly, because profiles built
//! from them interoperate with other tools.

use hdrcal_math::{Mat3, Vec3};
use hdrcal_transfer::pq;

/// XYZ -> linear BT.2020 RGB (D65).
pub const XYZ_TO_BT2020: Mat3 = Mat3::from_rows([
    [1.71665119, -0.35567078, -0.25336628],
    [-0.66668435, 1.61648124, 0.01576855],
    [0.01763986, -0.04277061, 0.94210312],
]);

/// Linear BT.2020 RGB (D65) -> XYZ.
pub const BT2020_TO_XYZ: Mat3 = Mat3::from_rows([
    [0.6369580483012914, 0.14461690358620832, 0.16888097516417210],
    [0.2627002120112671, 0.67799807151887080, 0.05930171646986196],
    [0.0000000000000000, 0.02807269304908743, 1.06098505771079100],
]);

/// Converts XYZ to linear BT.2020 RGB, clipping negative components.
///
/// Out-of-gamut colors are clipped to the gamut boundary, not
/// rejected; a negative linear component would be an illegal PQ input.
#[inline]
pub fn xyz_to_linear_rgb(xyz: Vec3) -> Vec3 {
    (XYZ_TO_BT2020 * xyz).max_scalar(0.0)
}

/// Converts linear BT.2020 RGB to XYZ, clipping negative results.
#[inline]
pub fn linear_rgb_to_xyz(rgb: Vec3) -> Vec3 {
    (BT2020_TO_XYZ * rgb).max_scalar(0.0)
}

/// Converts normalized XYZ (1 = 10,000 nits) to PQ-encoded BT.2020 RGB.
///
/// # Example
///
/// ```rust
/// use hdrcal_color::{bt2020, xyz};
///
/// let w = xyz::xyy_to_xyz(0.3127, 0.3290, 100.0);
/// let [r, g, b] = bt2020::xyz_to_pq_rgb(w);
/// // D65 gray: all channels near-equal
/// assert!((r - g).abs() < 1e-3 && (g - b).abs() < 1e-3);
/// ```
#[inline]
pub fn xyz_to_pq_rgb(xyz: Vec3) -> [f64; 3] {
    let rgb = xyz_to_linear_rgb(xyz);
    pq::encode_rgb(rgb.to_array())
}

/// Converts PQ-encoded BT.2020 RGB to normalized XYZ.
#[inline]
pub fn pq_rgb_to_xyz(rgb_pq: [f64; 3]) -> Vec3 {
    let rgb = pq::decode_rgb(rgb_pq);
    linear_rgb_to_xyz(Vec3::from_array(rgb))
}

//! White-relative CIELAB transform.
//!
//! Operates on the workspace's PQ-normalized XYZ (1 = 10,000 nits);
//! the caller supplies the reference white in the same normalization.

use hdrcal_math::Vec3;

const DELTA: f64 = 6.0 / 29.0;

#[inline]
fn f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

#[inline]
fn f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Converts XYZ to Lab relative to `white` (same normalization).
///
/// # Example
///
/// ```rust
/// use hdrcal_color::lab::xyz_to_lab;
/// use hdrcal_math::Vec3;
///
/// let white = Vec3::new(0.09505, 0.1, 0.10891);
/// let lab = xyz_to_lab(white, white);
/// assert!((lab[0] - 100.0).abs() < 1e-9); // L* of white is 100
/// assert!(lab[1].abs() < 1e-9 && lab[2].abs() < 1e-9);
/// ```
pub fn xyz_to_lab(xyz: Vec3, white: Vec3) -> [f64; 3] {
    let fx = f(xyz.x / white.x);
    let fy = f(xyz.y / white.y);
    let fz = f(xyz.z / white.z);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Converts Lab back to XYZ relative to `white`.
pub fn lab_to_xyz(lab: [f64; 3], white: Vec3) -> Vec3 {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    Vec3::new(
        white.x * f_inv(fx),
        white.y * f_inv(fy),
        white.z * f_inv(fz),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Vec3 = Vec3::new(0.09505, 0.1, 0.10891);

    #[test]
    fn test_white_is_neutral() {
        let lab = xyz_to_lab(WHITE, WHITE);
        assert!((lab[0] - 100.0).abs() < 1e-9);
        assert!(lab[1].abs() < 1e-9);
        assert!(lab[2].abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip() {
        let xyz = Vec3::new(0.04, 0.05, 0.03);
        let back = lab_to_xyz(xyz_to_lab(xyz, WHITE), WHITE);
        assert!((back.x - xyz.x).abs() < 1e-12);
        assert!((back.y - xyz.y).abs() < 1e-12);
        assert!((back.z - xyz.z).abs() < 1e-12);
    }

    #[test]
    fn test_dark_branch_roundtrip() {
        // Exercise the linear segment of f / f_inv
        let xyz = Vec3::new(2e-4, 2e-4, 2e-4);
        let back = lab_to_xyz(xyz_to_lab(xyz, WHITE), WHITE);
        assert!((back.y - xyz.y).abs() < 1e-15);
    }
}

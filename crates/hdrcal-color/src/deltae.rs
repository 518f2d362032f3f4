//! Perceptual color-difference metrics.
//!
//! [`delta_e_itp`] (BT.2124) is the primary metric for judging HDR
//! calibration quality; [`delta_e_2000`] (CIEDE2000) is kept for
//! cross-checking and debugging against SDR-era tooling.

use crate::{ictcp, lab, xyz};
use hdrcal_math::Vec3;
use hdrcal_primaries::D65_XY;

/// ΔE_ITP (BT.2124) between two normalized XYZ triples.
///
/// Both inputs use the 1 = 10,000 nits normalization. Identical inputs
/// yield exactly zero.
///
/// ```text
/// ΔE_ITP = 720 * sqrt(ΔI² + 0.25·ΔT² + ΔP²)
/// ```
///
/// # Example
///
/// ```rust
/// use hdrcal_color::{deltae, xyz};
///
/// let a = xyz::xyy_to_xyz(0.3127, 0.3290, 100.0);
/// assert_eq!(deltae::delta_e_itp(a, a), 0.0);
/// ```
pub fn delta_e_itp(xyz1: Vec3, xyz2: Vec3) -> f64 {
    let [i1, t1, p1] = ictcp::xyz_to_ictcp(xyz1);
    let [i2, t2, p2] = ictcp::xyz_to_ictcp(xyz2);
    let di = i2 - i1;
    let dt = t2 - t1;
    let dp = p2 - p1;
    720.0 * (di * di + 0.25 * dt * dt + dp * dp).sqrt()
}

/// CIEDE2000 color difference between two Lab triples (kL=kC=kH=1).
///
/// Full reference formula including the G chroma compensation, the
/// hue-dependent T weighting, and the RT rotation term for the blue
/// region.
pub fn delta_e_2000(lab1: [f64; 3], lab2: [f64; 3]) -> f64 {
    let [l1, a1, b1] = lab1;
    let [l2, a2, b2] = lab2;

    let c1 = a1.hypot(b1);
    let c2 = a2.hypot(b2);
    let avg_c = (c1 + c2) / 2.0;

    let pow7 = |v: f64| v.powi(7);
    let g = 0.5 * (1.0 - (pow7(avg_c) / (pow7(avg_c) + pow7(25.0))).sqrt());
    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;
    let c1p = a1p.hypot(b1);
    let c2p = a2p.hypot(b2);
    let avg_cp = (c1p + c2p) / 2.0;

    let h1p = b1.atan2(a1p).to_degrees().rem_euclid(360.0);
    let h2p = b2.atan2(a2p).to_degrees().rem_euclid(360.0);

    let dlp = l2 - l1;
    let dcp = c2p - c1p;

    let mut dhp = h2p - h1p;
    if dhp > 180.0 {
        dhp -= 360.0;
    } else if dhp < -180.0 {
        dhp += 360.0;
    }
    if c1p * c2p == 0.0 {
        dhp = 0.0;
    }
    let dhp_term = 2.0 * (c1p * c2p).sqrt() * (dhp.to_radians() / 2.0).sin();

    let avg_lp = (l1 + l2) / 2.0;
    let avg_hp = if c1p * c2p == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() > 180.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p) / 2.0
    };

    let t = 1.0 - 0.17 * (avg_hp - 30.0).to_radians().cos()
        + 0.24 * (2.0 * avg_hp).to_radians().cos()
        + 0.32 * (3.0 * avg_hp + 6.0).to_radians().cos()
        - 0.20 * (4.0 * avg_hp - 63.0).to_radians().cos();

    let d_ro = 30.0 * (-((avg_hp - 275.0) / 25.0).powi(2)).exp();
    let rc = 2.0 * (pow7(avg_cp) / (pow7(avg_cp) + pow7(25.0))).sqrt();
    let sl = 1.0 + (0.015 * (avg_lp - 50.0).powi(2)) / (20.0 + (avg_lp - 50.0).powi(2)).sqrt();
    let sc = 1.0 + 0.045 * avg_cp;
    let sh = 1.0 + 0.015 * avg_cp * t;
    let rt = -(2.0 * d_ro).to_radians().sin() * rc;

    let dl_term = dlp / sl;
    let dc_term = dcp / sc;
    let dh_term = dhp_term / sh;

    (dl_term * dl_term + dc_term * dc_term + dh_term * dh_term + rt * dc_term * dh_term).sqrt()
}

/// CIEDE2000 between two normalized XYZ triples.
///
/// Lab is taken relative to a 1000-nit D65 white so that HDR gray-ramp
/// samples land in a sensible L* range.
pub fn xyz_delta_e_2000(xyz1: Vec3, xyz2: Vec3) -> f64 {
    let white = xyz::xyy_to_xyz(D65_XY.0, D65_XY.1, 1000.0);
    let lab1 = lab::xyz_to_lab(xyz1, white);
    let lab2 = lab::xyz_to_lab(xyz2, white);
    delta_e_2000(lab1, lab2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xyz::xyy_to_xyz;

    #[test]
    fn test_itp_identity() {
        for (x, y, nits) in [
            (0.3127, 0.3290, 100.0),
            (0.64, 0.33, 50.0),
            (0.17, 0.70, 400.0),
        ] {
            let p = xyy_to_xyz(x, y, nits);
            assert_eq!(delta_e_itp(p, p), 0.0);
        }
    }

    #[test]
    fn test_itp_symmetry() {
        let a = xyy_to_xyz(0.3127, 0.3290, 100.0);
        let b = xyy_to_xyz(0.3200, 0.3300, 110.0);
        assert!((delta_e_itp(a, b) - delta_e_itp(b, a)).abs() < 1e-12);
    }

    #[test]
    fn test_itp_grows_with_luminance_error() {
        let target = xyy_to_xyz(0.3127, 0.3290, 100.0);
        let small = xyy_to_xyz(0.3127, 0.3290, 102.0);
        let large = xyy_to_xyz(0.3127, 0.3290, 130.0);
        let de_small = delta_e_itp(target, small);
        let de_large = delta_e_itp(target, large);
        assert!(de_small > 0.0);
        assert!(de_large > de_small);
    }

    #[test]
    fn test_de2000_identity_and_symmetry() {
        let lab1 = [50.0, 2.6772, -79.7751];
        let lab2 = [50.0, 0.0, -82.7485];
        assert_eq!(delta_e_2000(lab1, lab1), 0.0);
        assert!((delta_e_2000(lab1, lab2) - delta_e_2000(lab2, lab1)).abs() < 1e-12);
    }

    #[test]
    fn test_de2000_sharma_pair() {
        // Pair 1 from the Sharma et al. CIEDE2000 test data
        let de = delta_e_2000([50.0, 2.6772, -79.7751], [50.0, 0.0, -82.7485]);
        assert!((de - 2.0425).abs() < 1e-4, "de={de}");
    }

    #[test]
    fn test_de2000_neutral_pair() {
        // Grays with no chroma exercise the C1p*C2p == 0 branches
        let de = delta_e_2000([40.0, 0.0, 0.0], [42.0, 0.0, 0.0]);
        assert!(de > 0.0 && de.is_finite());
    }
}

//! # hdrcal-targets
//!
//! Decides which chromaticity/luminance points to probe with the
//! instrument, given a measured device gamut, so the matrix fit is
//! well constrained where it matters.
//!
//! Each perceptually significant test chromaticity (skin, foliage,
//! sky, 80%-saturation primaries, ...) is probed at the maximum
//! luminance the *measured* gamut can display for that chromaticity,
//! anchored to a white patch. Measuring at the achievable gamut
//! boundary maximizes signal where the device can actually
//! differentiate colors; chromaticities outside the device gamut are
//! skipped with a warning, never an error.
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_primaries::{REC2020, rgb_to_xyz_matrix};
//! use hdrcal_targets::{SRGB_TEST_COLORS_XY, max_luminance_scale};
//!
//! let basis = rgb_to_xyz_matrix(&REC2020).unwrap();
//! // Every sRGB test color fits inside a BT.2020 panel
//! for &xy in SRGB_TEST_COLORS_XY {
//!     assert!(max_luminance_scale(&basis, xy, [1.0; 3]) > 0.0);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use hdrcal_color::xyz::xyy_to_xyz;
use hdrcal_math::{Mat3, Vec3};
use hdrcal_primaries::{D65_XY, GamutResult, Primaries, rgb_to_xyz_matrix};
use hdrcal_transfer::pq;
use tracing::{debug, warn};

/// Perceptually significant test chromaticities inside sRGB.
///
/// Memory colors (skin, foliage, sky, sea) plus mid-saturation hues
/// and the sRGB primaries at 80% saturation.
pub const SRGB_TEST_COLORS_XY: &[(f64, f64)] = &[
    (0.389, 0.365),           // neutral skin
    (0.322, 0.510),           // grass green
    (0.388, 0.487),           // yellowish foliage
    (0.235, 0.263),           // sky blue
    (0.237, 0.337),           // sea cyan
    (0.577, 0.322),           // mid red
    (0.421, 0.480),           // bright yellow
    (0.274, 0.174),           // dark purple
    (0.59049931, 0.34674064), // sRGB red @ 0.8 saturation
    (0.31165312, 0.54200542), // sRGB green @ 0.8 saturation
    (0.17143554, 0.0812876),  // sRGB blue @ 0.8 saturation
];

/// Additional test chromaticities for Display P3 panels.
///
/// Points outside sRGB but inside P3, plus P3 primaries at 80%
/// saturation.
pub const P3D65_TEST_COLORS_XY: &[(f64, f64)] = &[
    (0.624, 0.370),           // deep orange
    (0.480, 0.499),           // vivid yellow
    (0.311, 0.649),           // chartreuse
    (0.243, 0.571),           // green-leaning cyan
    (0.550, 0.256),           // magenta
    (0.63655244, 0.34614053), // P3 red @ 0.8 saturation
    (0.29110012, 0.61804697), // P3 green @ 0.8 saturation
];

/// Default anchor luminance cap for calibration patches (nits).
pub const CALIBRATION_ANCHOR_NITS: f64 = 200.0;

/// Largest uniform scale at which `xy` is displayable.
///
/// Inverts the device basis, finds the linear RGB mix producing 1 unit
/// of luminance at `xy`, and returns the largest scale keeping every
/// component within `caps`. Chromaticities requiring a negative
/// component lie outside the device gamut and return 0.0; a primary of
/// the gamut itself returns exactly its cap.
pub fn max_luminance_scale(device_basis: &Mat3, xy: (f64, f64), caps: [f64; 3]) -> f64 {
    const TOL: f64 = 1e-12;
    let (x, y) = xy;
    if y <= 0.0 {
        return 0.0;
    }
    let Some(inv) = device_basis.inverse() else {
        warn!("device basis is singular, treating every color as out of gamut");
        return 0.0;
    };

    // Linear RGB needed per unit luminance of this chromaticity
    let per_y = inv * Vec3::new(x / y, 1.0, (1.0 - x - y) / y);
    let per_y = per_y.to_array();
    if per_y.iter().any(|&c| c < -TOL) {
        return 0.0;
    }

    let mut best = f64::INFINITY;
    for (c, cap) in per_y.iter().zip(caps) {
        if *c > TOL {
            best = best.min(cap / c);
        }
    }
    if best.is_finite() { best.max(0.0) } else { 0.0 }
}

/// [`max_luminance_scale`] against a gamut defined by xy primaries.
///
/// A degenerate primary set yields 0.0 for every chromaticity (same
/// out-of-gamut treatment), matching the skip-not-fail contract.
pub fn max_luminance_scale_from_primaries(
    primaries: &Primaries,
    xy: (f64, f64),
    caps: [f64; 3],
) -> f64 {
    match rgb_to_xyz_matrix(primaries) {
        Ok(basis) => max_luminance_scale(&basis, xy, caps),
        Err(_) => 0.0,
    }
}

/// The white-patch target anchoring a calibration pass.
///
/// D65 at `min(0.8 * white_nits, 200)`: bright enough for a clean
/// chromaticity reading, far enough below peak to avoid ABL kicking in
/// on OLED panels.
pub fn white_calibration_target(white_nits: f64) -> Vec3 {
    let y = (white_nits * 0.8).min(CALIBRATION_ANCHOR_NITS);
    xyy_to_xyz(D65_XY.0, D65_XY.1, y)
}

/// PQ-uniform luminance ladder at a fixed chromaticity.
///
/// Samples `count` luminances spaced uniformly in PQ code between
/// `min_nits` and `max_nits` (perceptually even steps), returned as
/// normalized XYZ targets. A single-sample request lands on the PQ
/// midpoint of the range.
pub fn pq_uniform_ladder(xy: (f64, f64), min_nits: f64, max_nits: f64, count: usize) -> Vec<Vec3> {
    let (lo, hi) = if min_nits <= max_nits {
        (min_nits, max_nits)
    } else {
        (max_nits, min_nits)
    };
    if count == 0 {
        return Vec::new();
    }
    let e_lo = pq::oetf(lo);
    let e_hi = pq::oetf(hi);
    let codes: Vec<f64> = if count == 1 {
        vec![0.5 * (e_lo + e_hi)]
    } else {
        (0..count)
            .map(|i| e_lo + (e_hi - e_lo) * i as f64 / (count - 1) as f64)
            .collect()
    };
    codes
        .into_iter()
        .map(|e| xyy_to_xyz(xy.0, xy.1, pq::eotf(e)))
        .collect()
}

/// White-ramp measurement ladder: 10 PQ-uniform D65 grays between
/// 0.005 nits and 80% of the measured white.
pub fn white_measurement_ladder(white_nits: f64) -> Vec<Vec3> {
    pq_uniform_ladder(D65_XY, 0.005, white_nits * 0.8, 10)
}

/// Builds gamut-boundary XYZ targets for a list of test chromaticities.
///
/// `device` is the measured panel gamut as xy primaries; `anchor` the
/// white target whose luminance scales the suite. Test chromaticities
/// the device cannot display are skipped with a log line; the result
/// keeps input order.
pub fn chromaticity_targets(
    device: &Primaries,
    anchor: Vec3,
    test_colors: &[(f64, f64)],
) -> GamutResult<Vec<Vec3>> {
    let basis = rgb_to_xyz_matrix(device)?;
    let anchor_nits = anchor.y * pq::L_MAX;
    let caps = [1.0; 3];

    let mut targets = Vec::with_capacity(test_colors.len());
    for &(x, y) in test_colors {
        let y_max = max_luminance_scale(&basis, (x, y), caps) * anchor_nits;
        if y_max == 0.0 {
            warn!(x, y, "test color outside measured gamut, skipping");
            continue;
        }
        let xyz = xyy_to_xyz(x, y, y_max);
        debug!(x, y, nits = y_max, "gamut-boundary target");
        targets.push(xyz);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrcal_color::xyz::xyz_to_xy;
    use hdrcal_primaries::{REC2020, SRGB};

    #[test]
    fn test_primary_is_fully_displayable() {
        let basis = rgb_to_xyz_matrix(&REC2020).unwrap();
        let scale = max_luminance_scale(&basis, REC2020.r, [1.0; 3]);
        // The red primary itself only lights the red channel; its max
        // scale is red's share of white luminance
        let red_y = basis.col(0).y;
        assert!((scale - red_y).abs() < 1e-9, "scale={scale}, red_y={red_y}");
    }

    #[test]
    fn test_out_of_gamut_is_zero() {
        let basis = rgb_to_xyz_matrix(&SRGB).unwrap();
        // BT.2020 green sits well outside sRGB
        assert_eq!(max_luminance_scale(&basis, REC2020.g, [1.0; 3]), 0.0);
        // Degenerate chromaticity
        assert_eq!(max_luminance_scale(&basis, (0.3, 0.0), [1.0; 3]), 0.0);
    }

    #[test]
    fn test_white_scale_is_unity() {
        // The white point mixes all channels at exactly their caps
        let basis = rgb_to_xyz_matrix(&SRGB).unwrap();
        let scale = max_luminance_scale(&basis, SRGB.w, [1.0; 3]);
        assert!((scale - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_white_calibration_target_caps_at_200() {
        let bright = white_calibration_target(1000.0);
        assert!((bright.y * pq::L_MAX - 200.0).abs() < 1e-9);
        let dim = white_calibration_target(150.0);
        assert!((dim.y * pq::L_MAX - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_pq_ladder_is_pq_uniform() {
        let ladder = pq_uniform_ladder(D65_XY, 0.01, 800.0, 10);
        assert_eq!(ladder.len(), 10);
        let codes: Vec<f64> = ladder
            .iter()
            .map(|xyz| pq::oetf(xyz.y * pq::L_MAX))
            .collect();
        let step = codes[1] - codes[0];
        for w in codes.windows(2) {
            assert!(((w[1] - w[0]) - step).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pq_ladder_single_sample_is_midpoint() {
        let one = pq_uniform_ladder(D65_XY, 1.0, 100.0, 1);
        assert_eq!(one.len(), 1);
        let e = pq::oetf(one[0].y * pq::L_MAX);
        let expected = 0.5 * (pq::oetf(1.0) + pq::oetf(100.0));
        assert!((e - expected).abs() < 1e-9);
    }

    #[test]
    fn test_srgb_suite_fits_wide_panel() {
        // A BT.2020 panel displays the whole sRGB suite; chromaticity
        // of every target matches its test color
        let anchor = white_calibration_target(250.0);
        let targets = chromaticity_targets(&REC2020, anchor, SRGB_TEST_COLORS_XY).unwrap();
        assert_eq!(targets.len(), SRGB_TEST_COLORS_XY.len());
        for (t, &(x, y)) in targets.iter().zip(SRGB_TEST_COLORS_XY) {
            let (tx, ty) = xyz_to_xy(*t);
            assert!((tx - x).abs() < 1e-9 && (ty - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_narrow_panel_skips_wide_colors() {
        // An sRGB-only panel cannot show the saturated P3 additions
        let anchor = white_calibration_target(250.0);
        let targets = chromaticity_targets(&SRGB, anchor, P3D65_TEST_COLORS_XY).unwrap();
        assert!(targets.len() < P3D65_TEST_COLORS_XY.len());
    }
}

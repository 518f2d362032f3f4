//! Gamut patch table and measurement record.

use hdrcal_color::xyz::xyz_to_xy;
use hdrcal_math::Vec3;
use hdrcal_primaries::Primaries;

/// The six gamut patches, as 10-bit HDR codes.
///
/// 592 is the 10-bit PQ code for ~200 nits; the 200-nit patches keep
/// OLED ABL out of the chromaticity measurements while the full-drive
/// white captures the real peak.
pub const GAMUT_PATCHES: &[(&str, [u32; 3])] = &[
    ("red", [592, 0, 0]),
    ("green", [0, 592, 0]),
    ("blue", [0, 0, 592]),
    ("white", [1023, 1023, 1023]),
    ("white_200nit", [592, 592, 592]),
    ("black", [0, 0, 0]),
];

/// XYZ readings (absolute cd/m²) of one gamut measurement pass.
#[derive(Debug, Clone)]
pub struct GamutMeasurement {
    /// Full-drive red patch.
    pub red: Vec3,
    /// Full-drive green patch.
    pub green: Vec3,
    /// Full-drive blue patch.
    pub blue: Vec3,
    /// Full-drive white patch.
    pub white: Vec3,
    /// 200-nit white patch.
    pub white_200nit: Vec3,
    /// Black patch.
    pub black: Vec3,
    /// Reading at the lowest gray code measurably above black.
    pub min_activated_black: Vec3,
}

impl GamutMeasurement {
    /// The measured gamut as xy primaries (white from the full white).
    pub fn primaries(&self) -> Primaries {
        Primaries {
            r: xyz_to_xy(self.red),
            g: xyz_to_xy(self.green),
            b: xyz_to_xy(self.blue),
            w: xyz_to_xy(self.white),
            name: "measured",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_table() {
        assert_eq!(GAMUT_PATCHES.len(), 6);
        let white = GAMUT_PATCHES.iter().find(|(n, _)| *n == "white").unwrap();
        assert_eq!(white.1, [1023, 1023, 1023]);
    }

    #[test]
    fn test_primaries_from_measurement() {
        let g = GamutMeasurement {
            red: Vec3::new(300.0, 150.0, 10.0),
            green: Vec3::new(120.0, 400.0, 40.0),
            blue: Vec3::new(60.0, 30.0, 320.0),
            white: Vec3::new(480.0, 580.0, 370.0),
            white_200nit: Vec3::new(160.0, 193.0, 123.0),
            black: Vec3::new(0.04, 0.05, 0.06),
            min_activated_black: Vec3::new(0.08, 0.1, 0.12),
        };
        let p = g.primaries();
        assert!((p.r.0 - 300.0 / 460.0).abs() < 1e-12);
        assert!(p.g.1 > p.g.0); // green chromaticity sits high in y
    }
}

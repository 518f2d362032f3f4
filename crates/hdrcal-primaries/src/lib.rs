//! # hdrcal-primaries
//!
//! Color primaries, white points, and gamut basis matrix generation.
//!
//! A gamut basis is the RGB->XYZ matrix implied by a set of primary
//! chromaticities and a white point: each primary's XYZ direction is
//! scaled so the all-ones RGB vector maps exactly onto the white
//! point. The same construction works for reference gamuts defined by
//! standards constants and for device gamuts measured live with a
//! colorimeter.
//!
//! These constants are the single source of truth for the workspace;
//! no other crate restates a primary or white-point coordinate.
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_primaries::{REC2020, rgb_to_xyz_matrix};
//! use hdrcal_math::Vec3;
//!
//! let m = rgb_to_xyz_matrix(&REC2020).unwrap();
//! let white = m * Vec3::ONE;
//! assert!((white.y - 1.0).abs() < 1e-9);
//! ```
//!
//! # Dependencies
//!
//! - [`hdrcal-math`] - matrix operations
//!
//! # Used By
//!
//! - `hdrcal-color` - reference white for Lab/ΔE2000
//! - `hdrcal-targets` - maximum-luminance solves per chromaticity
//! - `hdrcal-session` - measured device gamut bases

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use hdrcal_math::{Mat3, Vec3};
use thiserror::Error;

/// Errors from gamut basis construction.
#[derive(Debug, Error)]
pub enum GamutError {
    /// The primary matrix is not invertible: duplicate or collinear
    /// primaries cannot define a basis.
    #[error("primary matrix is singular, cannot build gamut basis")]
    SingularBasis,

    /// A chromaticity coordinate is invalid (y <= 0 or not finite).
    #[error("invalid chromaticity: ({x}, {y})")]
    InvalidChromaticity {
        /// x coordinate
        x: f64,
        /// y coordinate
        y: f64,
    },
}

/// Result type for gamut operations.
pub type GamutResult<T> = Result<T, GamutError>;

/// RGB color space primaries definition.
///
/// Defines a color space by its three primary colors and white point,
/// all specified as CIE xy chromaticity coordinates.
///
/// # Example
///
/// ```rust
/// use hdrcal_primaries::Primaries;
///
/// let measured = Primaries {
///     r: (0.675, 0.310),
///     g: (0.212, 0.715),
///     b: (0.145, 0.052),
///     w: (0.3127, 0.3290),
///     name: "panel",
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primaries {
    /// Red primary (x, y) chromaticity
    pub r: (f64, f64),
    /// Green primary (x, y) chromaticity
    pub g: (f64, f64),
    /// Blue primary (x, y) chromaticity
    pub b: (f64, f64),
    /// White point (x, y) chromaticity
    pub w: (f64, f64),
    /// Color space name
    pub name: &'static str,
}

impl Primaries {
    /// White point as XYZ (Y = 1).
    #[inline]
    pub fn white_xyz(&self) -> Vec3 {
        xy_to_xyz(self.w.0, self.w.1)
    }
}

// ============================================================================
// Standard white points and primaries
// ============================================================================

/// D65 white point chromaticity (daylight, ~6500K).
pub const D65_XY: (f64, f64) = (0.3127, 0.3290);

/// sRGB / Rec.709 primaries (D65 white point).
pub const SRGB: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.3000, 0.6000),
    b: (0.1500, 0.0600),
    w: D65_XY,
    name: "sRGB",
};

/// Display P3 primaries (D65 white point).
///
/// DCI-P3 primaries with the D65 white of consumer wide-gamut panels.
pub const DISPLAY_P3: Primaries = Primaries {
    r: (0.6800, 0.3200),
    g: (0.2650, 0.6900),
    b: (0.1500, 0.0600),
    w: D65_XY,
    name: "Display P3",
};

/// Rec.2020 primaries (D65 white point).
///
/// The container gamut of the HDR10 signal this tool calibrates.
pub const REC2020: Primaries = Primaries {
    r: (0.7080, 0.2920),
    g: (0.1700, 0.7970),
    b: (0.1310, 0.0460),
    w: D65_XY,
    name: "Rec.2020",
};

// ============================================================================
// Matrix generation
// ============================================================================

/// Converts xy chromaticity to an XYZ direction with Y = 1.
fn xy_to_xyz(x: f64, y: f64) -> Vec3 {
    if y.abs() < 1e-10 {
        Vec3::ZERO
    } else {
        Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
    }
}

/// Computes the RGB->XYZ matrix for a set of primaries.
///
/// Primaries are definitional, so the white alignment is a single
/// exact linear solve, not a least-squares fit. The resulting matrix
/// maps `[1, 1, 1]` onto the white point XYZ (Y = 1).
///
/// # Errors
///
/// [`GamutError::SingularBasis`] when the primaries are degenerate
/// (duplicate or collinear chromaticities).
///
/// # Example
///
/// ```rust
/// use hdrcal_primaries::{SRGB, rgb_to_xyz_matrix};
/// use hdrcal_math::Vec3;
///
/// let m = rgb_to_xyz_matrix(&SRGB).unwrap();
/// let white = m * Vec3::ONE;
/// assert!((white.y - 1.0).abs() < 1e-9);
/// ```
pub fn rgb_to_xyz_matrix(primaries: &Primaries) -> GamutResult<Mat3> {
    let r_xyz = xy_to_xyz(primaries.r.0, primaries.r.1);
    let g_xyz = xy_to_xyz(primaries.g.0, primaries.g.1);
    let b_xyz = xy_to_xyz(primaries.b.0, primaries.b.1);
    let w_xyz = xy_to_xyz(primaries.w.0, primaries.w.1);

    // Primaries as columns; solve M * s = W for the per-channel scales
    let m = Mat3::from_col_vecs(r_xyz, g_xyz, b_xyz);
    let s = m.solve(w_xyz).ok_or(GamutError::SingularBasis)?;
    Ok(m.scale_cols(s))
}

/// Computes the XYZ->RGB matrix for a set of primaries.
///
/// Inverse of [`rgb_to_xyz_matrix`].
pub fn xyz_to_rgb_matrix(primaries: &Primaries) -> GamutResult<Mat3> {
    rgb_to_xyz_matrix(primaries)?
        .inverse()
        .ok_or(GamutError::SingularBasis)
}

/// Computes a linear RGB->RGB mapping between two primary sets.
///
/// The conversion goes through XYZ: `RGB_src -> XYZ -> RGB_dst`.
/// No chromatic adaptation is applied; both gamuts here share D65.
pub fn rgb_to_rgb_matrix(src: &Primaries, dst: &Primaries) -> GamutResult<Mat3> {
    Ok(xyz_to_rgb_matrix(dst)? * rgb_to_xyz_matrix(src)?)
}

/// Builds a device RGB->XYZ basis from measured full-field patches.
///
/// Takes the XYZ readings of pure red/green/blue and white patches
/// (same window size and average picture level), optionally subtracts
/// a measured black floor, and scales the primary columns so
/// `M * [1, 1, 1]` reproduces the measured white exactly.
///
/// Unlike [`rgb_to_xyz_matrix`] the inputs carry absolute luminance,
/// so the basis is in the same units as the measurements.
///
/// # Errors
///
/// [`GamutError::SingularBasis`] when the measured primaries are
/// linearly dependent (a broken measurement, not a valid panel).
pub fn device_basis_from_measured(
    red: Vec3,
    green: Vec3,
    blue: Vec3,
    white: Vec3,
    black: Option<Vec3>,
) -> GamutResult<Mat3> {
    let k = black.unwrap_or(Vec3::ZERO);
    let m = Mat3::from_col_vecs(red - k, green - k, blue - k);
    let s = m.solve(white - k).ok_or(GamutError::SingularBasis)?;
    Ok(m.scale_cols(s))
}

//! sRGB transfer function.
//!
//! Piecewise curve combining a linear segment near black with a power
//! segment (approximately gamma 2.2) for the rest. Inputs are clamped
//! to [0, 1] on both sides.
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

const A: f64 = 0.055;

/// sRGB EOTF: decodes an sRGB code to linear light.
///
/// # Example
///
/// ```rust
/// use hdrcal_transfer::srgb::eotf;
///
/// let linear = eotf(0.5);
/// assert!((linear - 0.214).abs() < 0.01);
/// ```
#[inline]
pub fn eotf(v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + A) / (1.0 + A)).powf(2.4)
    }
}

/// sRGB OETF: encodes linear light to an sRGB code.
///
/// # Example
///
/// ```rust
/// use hdrcal_transfer::srgb::oetf;
///
/// let code = oetf(0.214);
/// assert!((code - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn oetf(l: f64) -> f64 {
    let l = l.clamp(0.0, 1.0);
    if l <= 0.0031308 {
        l * 12.92
    } else {
        (1.0 + A) * l.powf(1.0 / 2.4) - A
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for i in 0..=1000 {
            let v = i as f64 / 1000.0;
            let back = oetf(eotf(v));
            assert!((v - back).abs() < 1e-12, "v={v}, back={back}");
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(eotf(0.0), 0.0);
        assert!((eotf(1.0) - 1.0).abs() < 1e-12);
        assert_eq!(oetf(0.0), 0.0);
        assert!((oetf(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(eotf(-0.2), 0.0);
        assert!((oetf(1.5) - 1.0).abs() < 1e-12);
    }
}

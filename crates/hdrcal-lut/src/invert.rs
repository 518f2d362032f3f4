//! Functional inversion of an existing LUT.

use crate::{LutError, LutResult};

/// Builds the function-inverse of a LUT.
///
/// For each forward entry `lut[i] = y`, the slot `round(y * (L))` of
/// the inverse receives `i / L` (with `L = len - 1`). Slots no forward
/// entry maps to are backfilled from the nearest written slot on
/// either side, ties resolving toward the lower index.
///
/// For a strictly monotonic input this is an involution up to the
/// table's discretization error.
///
/// # Errors
///
/// [`LutError::TooShort`] for inputs under two entries,
/// [`LutError::NotFinite`] for NaN/infinite entries.
///
/// # Example
///
/// ```rust
/// use hdrcal_lut::invert::inverse_lut;
/// use hdrcal_lut::ramp::identity_ramp;
///
/// let ramp = identity_ramp(256);
/// let inv = inverse_lut(&ramp).unwrap();
/// assert_eq!(inv.len(), 256);
/// assert!((inv[128] - 128.0 / 255.0).abs() < 1e-12);
/// ```
pub fn inverse_lut(lut: &[f64]) -> LutResult<Vec<f64>> {
    if lut.len() < 2 {
        return Err(LutError::TooShort(lut.len()));
    }
    if let Some(idx) = lut.iter().position(|v| !v.is_finite()) {
        return Err(LutError::NotFinite(idx));
    }

    let last = lut.len() - 1;
    let scale = last as f64;
    let mut out = vec![f64::NAN; lut.len()];
    for (i, &y) in lut.iter().enumerate() {
        let j = (y * scale).round().clamp(0.0, scale) as usize;
        out[j] = i as f64 / scale;
    }

    // Backfill unwritten slots by nearest written neighbor
    let written: Vec<usize> = (0..out.len()).filter(|&i| !out[i].is_nan()).collect();
    debug_assert!(!written.is_empty());
    for i in 0..out.len() {
        if !out[i].is_nan() {
            continue;
        }
        let j = written.partition_point(|&w| w < i);
        let left = j.checked_sub(1).map(|k| written[k]);
        let right = written.get(j).copied();
        let pick = match (left, right) {
            (Some(l), Some(r)) => {
                if i - l <= r - i {
                    l
                } else {
                    r
                }
            }
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (None, None) => unreachable!("every forward entry writes a slot"),
        };
        out[i] = out[pick];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ramp::identity_ramp;

    #[test]
    fn test_identity_is_fixed_point() {
        let ramp = identity_ramp(128);
        let inv = inverse_lut(&ramp).unwrap();
        for (a, b) in ramp.iter().zip(&inv) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_double_inversion_approximates_original() {
        // Strictly monotonic gamma-ish curve
        let lut: Vec<f64> = (0..256).map(|i| (i as f64 / 255.0).powf(1.8)).collect();
        let twice = inverse_lut(&inverse_lut(&lut).unwrap()).unwrap();
        let step = 1.0 / 255.0;
        for (i, (&a, &b)) in lut.iter().zip(&twice).enumerate() {
            assert!(
                (a - b).abs() <= 2.0 * step,
                "entry {i}: {a} vs {b}"
            );
        }
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let lut: Vec<f64> = (0..1024).map(|i| (i as f64 / 1023.0).sqrt()).collect();
        let inv = inverse_lut(&lut).unwrap();
        // lut(inv(x)) ~ x by nearest-index composition
        for i in (0..1024).step_by(37) {
            let x = i as f64 / 1023.0;
            let mid = inv[(x * 1023.0).round() as usize];
            let back = lut[(mid * 1023.0).round() as usize];
            assert!((back - x).abs() < 4.0 / 1023.0, "x={x}, back={back}");
        }
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(matches!(inverse_lut(&[0.5]), Err(LutError::TooShort(1))));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(matches!(
            inverse_lut(&[0.0, f64::NAN]),
            Err(LutError::NotFinite(1))
        ));
    }
}

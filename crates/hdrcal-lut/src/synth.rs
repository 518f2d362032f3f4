//! Corrective LUT synthesis from measured response curves.
//!
//! Pipeline: repair monotonicity of the measured curve, oversample it
//! with evenly divisible interpolation intervals, then approximate the
//! curve's functional inverse by nearest-index search for every target
//! output code. The resulting table answers "what input code, when
//! displayed, produces (approximately) this target output code".

use crate::ramp::identity_ramp;
use crate::{DEFAULT_LUT_LEN, LutError, LutResult, RgbLut};
use tracing::warn;

/// Clamps every sample up to its predecessor, in place.
///
/// A physical display response is non-decreasing; any observed
/// decrease is measurement noise. Idempotent: a second pass is a
/// no-op.
///
/// # Example
///
/// ```rust
/// use hdrcal_lut::synth::monotonic_repair;
///
/// let mut curve = vec![0.0, 0.3, 0.2, 0.5];
/// monotonic_repair(&mut curve);
/// assert_eq!(curve, vec![0.0, 0.3, 0.3, 0.5]);
/// ```
pub fn monotonic_repair(curve: &mut [f64]) {
    for i in 1..curve.len() {
        if curve[i] < curve[i - 1] {
            curve[i] = curve[i - 1];
        }
    }
}

/// Largest oversampled length `<= limit` of the form `n + k*(n-1)`.
///
/// Lengths of this form split every source interval into the same
/// number of interpolation steps, so the oversampled grid divides
/// evenly and the nearest-index search sees uniform granularity.
pub fn oversample_len(n: usize, limit: usize) -> usize {
    debug_assert!(n >= 2);
    let k = if limit > n { (limit - n) / (n - 1) } else { 0 };
    n + k * (n - 1)
}

/// Linearly interpolates `arr` up to `target_len` entries.
///
/// Inserts an equal number of points into every interval, distributing
/// any remainder over the leading intervals. Returns a copy when
/// `target_len <= arr.len()`.
pub fn linear_interpolate(arr: &[f64], target_len: usize) -> Vec<f64> {
    let n = arr.len();
    if target_len <= n {
        return arr.to_vec();
    }
    let intervals = n - 1;
    let total_insert = target_len - n;
    let base = total_insert / intervals;
    let remainder = total_insert % intervals;

    let mut out = Vec::with_capacity(target_len);
    for i in 0..intervals {
        let start = arr[i];
        let end = arr[i + 1];
        let n_insert = base + usize::from(i < remainder);
        // This interval contributes its start plus the inserted points;
        // the end lands at the start of the next interval
        let steps = n_insert + 1;
        for j in 0..steps {
            out.push(start + (end - start) * j as f64 / steps as f64);
        }
    }
    out.push(arr[n - 1]);
    out
}

/// Plateau-aware variant of [`linear_interpolate`].
///
/// Runs of exactly equal consecutive values (clipped blacks/whites)
/// would interpolate into zero-slope dead zones that break the
/// nearest-index inverse. Instead, a plateau followed by a different
/// value is redistributed: the span from the plateau value to the next
/// different value is split linearly across the plateau's intervals.
/// A plateau running to the end of the array is kept as-is.
pub fn linear_interpolate_plateau_fix(arr: &[f64], target_len: usize) -> Vec<f64> {
    let n = arr.len();
    if target_len <= n {
        return arr.to_vec();
    }
    let intervals = n - 1;
    let total_insert = target_len - n;
    let base = total_insert / intervals;
    let remainder = total_insert % intervals;

    // Effective interval endpoints after plateau redistribution
    let mut starts = vec![0.0; intervals];
    let mut ends = vec![0.0; intervals];
    let mut i = 0;
    while i < intervals {
        let v0 = arr[i];
        if v0 != arr[i + 1] {
            starts[i] = v0;
            ends[i] = arr[i + 1];
            i += 1;
            continue;
        }
        // Plateau: extend to the first differing value
        let mut j = i + 1;
        while j < n && arr[j] == v0 {
            j += 1;
        }
        if j < n {
            let span = j - i;
            let v_next = arr[j];
            for k in 0..span {
                let t0 = k as f64 / span as f64;
                let t1 = (k + 1) as f64 / span as f64;
                starts[i + k] = v0 + (v_next - v0) * t0;
                ends[i + k] = v0 + (v_next - v0) * t1;
            }
            i += span;
        } else {
            // Trailing plateau stays flat
            for idx in i..intervals {
                starts[idx] = arr[idx];
                ends[idx] = arr[idx + 1];
            }
            break;
        }
    }

    let mut out = Vec::with_capacity(target_len);
    for idx in 0..intervals {
        let n_insert = base + usize::from(idx < remainder);
        let steps = n_insert + 1;
        for j in 0..steps {
            out.push(starts[idx] + (ends[idx] - starts[idx]) * j as f64 / steps as f64);
        }
    }
    out.push(arr[n - 1]);
    out
}

/// Index of the entry closest to `value` in a non-decreasing array.
///
/// Ties and plateaus resolve toward the lowest index, i.e. the lowest
/// input code that produces the value.
pub fn nearest_index(sorted: &[f64], value: f64) -> usize {
    let len = sorted.len();
    let j = sorted.partition_point(|&v| v < value);
    if j == 0 {
        return 0;
    }
    if j >= len {
        // All entries below `value`; first occurrence of the maximum
        return sorted.partition_point(|&v| v < sorted[len - 1]);
    }
    let left = sorted[j - 1];
    if (value - left) <= (sorted[j] - value) {
        // First occurrence of the left plateau value
        sorted.partition_point(|&v| v < left)
    } else {
        j
    }
}

/// Synthesizes the corrective LUT from a measured PQ response curve.
///
/// `measured_pq` holds the display's measured output codes at evenly
/// spaced input codes from 0 to 1; `target_pq` is the desired output
/// curve (identity ramp of [`DEFAULT_LUT_LEN`] when `None`). Entry `i`
/// of the result is the input code to send so the display produces
/// (approximately) `target_pq[i]`.
///
/// The synthesis pre-repairs monotonicity on the measurement but does
/// not enforce it on its own output; strict decreases there indicate a
/// pathological measurement and are surfaced as a warning.
///
/// # Errors
///
/// [`LutError::TooShort`] for curves under two samples,
/// [`LutError::NotFinite`] if any sample is NaN or infinite.
///
/// # Example
///
/// ```rust
/// use hdrcal_lut::synth::correction_lut_from_measured;
///
/// // Panel that crushes mid-tones: correction pushes codes up
/// let measured: Vec<f64> = (0..128)
///     .map(|i| (i as f64 / 127.0).powf(1.2))
///     .collect();
/// let lut = correction_lut_from_measured(&measured, None).unwrap();
/// assert!(lut[2048] > 0.5);
/// ```
pub fn correction_lut_from_measured(
    measured_pq: &[f64],
    target_pq: Option<&[f64]>,
) -> LutResult<Vec<f64>> {
    validate_curve(measured_pq)?;
    if let Some(t) = target_pq {
        validate_curve(t)?;
    }

    let mut real = measured_pq.to_vec();
    monotonic_repair(&mut real);

    let fallback;
    let target: &[f64] = match target_pq {
        Some(t) => t,
        None => {
            fallback = identity_ramp(DEFAULT_LUT_LEN);
            &fallback
        }
    };

    let m = oversample_len(real.len(), DEFAULT_LUT_LEN * 10);
    let dense = linear_interpolate(&real, m);
    let scale = (m - 1) as f64;
    let lut: Vec<f64> = target
        .iter()
        .map(|&t| nearest_index(&dense, t) as f64 / scale)
        .collect();

    let violations = lut.windows(2).filter(|w| w[1] < w[0]).count();
    if violations > 0 {
        warn!(
            violations,
            entries = lut.len(),
            "synthesized LUT is not monotonic, measurement quality is suspect"
        );
    }
    Ok(lut)
}

/// Synthesizes all three channel LUTs, one channel per rayon task.
///
/// Channels are independent, so this is a pure wall-clock
/// optimization; results are identical to three sequential calls.
pub fn correction_luts_rgb(
    red: &[f64],
    green: &[f64],
    blue: &[f64],
    targets: &RgbLut,
) -> LutResult<RgbLut> {
    let ((r, g), b) = rayon::join(
        || {
            rayon::join(
                || correction_lut_from_measured(red, Some(&targets.red)),
                || correction_lut_from_measured(green, Some(&targets.green)),
            )
        },
        || correction_lut_from_measured(blue, Some(&targets.blue)),
    );
    RgbLut::new(r?, g?, b?)
}

fn validate_curve(curve: &[f64]) -> LutResult<()> {
    if curve.len() < 2 {
        return Err(LutError::TooShort(curve.len()));
    }
    if let Some(idx) = curve.iter().position(|v| !v.is_finite()) {
        return Err(LutError::NotFinite(idx));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_idempotent() {
        let mut once = vec![0.0, 0.5, 0.3, 0.4, 0.9, 0.8];
        monotonic_repair(&mut once);
        let mut twice = once.clone();
        monotonic_repair(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(once, vec![0.0, 0.5, 0.5, 0.5, 0.9, 0.9]);
    }

    #[test]
    fn test_oversample_len_divides_evenly() {
        let m = oversample_len(128, DEFAULT_LUT_LEN * 10);
        assert_eq!((m - 128) % 127, 0);
        assert!(m <= DEFAULT_LUT_LEN * 10);
        assert_eq!(m, 40895);

        // Source longer than the limit is left alone
        assert_eq!(oversample_len(128, 64), 128);
    }

    #[test]
    fn test_linear_interpolate_uniform() {
        let dense = linear_interpolate(&[0.0, 0.5, 1.0], 9);
        assert_eq!(dense.len(), 9);
        for (i, v) in dense.iter().enumerate() {
            assert!((v - i as f64 / 8.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_interpolate_remainder_goes_first() {
        // 2 intervals, 3 inserts: first interval gets 2, second gets 1
        let dense = linear_interpolate(&[0.0, 1.0, 2.0], 5);
        assert_eq!(dense.len(), 5);
        assert_eq!(dense[0], 0.0);
        assert_eq!(*dense.last().unwrap(), 2.0);
    }

    #[test]
    fn test_plateau_fix_removes_dead_zone() {
        // Plateau at 0.5 followed by 0.8: naive interpolation leaves a
        // flat run, the fix ramps through it
        let src = [0.0, 0.5, 0.5, 0.5, 0.8];
        let naive = linear_interpolate(&src, 13);
        let fixed = linear_interpolate_plateau_fix(&src, 13);
        assert_eq!(fixed.len(), 13);

        let flat_naive = naive.windows(2).filter(|w| w[0] == w[1]).count();
        let flat_fixed = fixed.windows(2).filter(|w| w[0] == w[1]).count();
        assert!(flat_naive > 0);
        assert_eq!(flat_fixed, 0);
        // Endpoints preserved
        assert_eq!(fixed[0], 0.0);
        assert_eq!(*fixed.last().unwrap(), 0.8);
    }

    #[test]
    fn test_plateau_fix_trailing_plateau_kept() {
        let src = [0.0, 0.5, 1.0, 1.0, 1.0];
        let fixed = linear_interpolate_plateau_fix(&src, 13);
        assert_eq!(*fixed.last().unwrap(), 1.0);
        // The trailing clipped region stays clipped
        assert!(fixed.iter().rev().take(3).all(|&v| v == 1.0));
    }

    #[test]
    fn test_nearest_index_ties_go_left() {
        let arr = [0.0, 0.2, 0.2, 0.2, 0.6, 1.0];
        // Exact plateau hit resolves to the first occurrence
        assert_eq!(nearest_index(&arr, 0.2), 1);
        // Midpoint tie between 0.2 and 0.6 resolves left
        assert_eq!(nearest_index(&arr, 0.4), 1);
        assert_eq!(nearest_index(&arr, 0.41), 4);
        assert_eq!(nearest_index(&arr, -1.0), 0);
        assert_eq!(nearest_index(&arr, 2.0), 5);
    }

    #[test]
    fn test_identity_panel_gives_identity_lut() {
        let measured: Vec<f64> = (0..128).map(|i| i as f64 / 127.0).collect();
        let lut = correction_lut_from_measured(&measured, None).unwrap();
        assert_eq!(lut.len(), DEFAULT_LUT_LEN);
        let step = 1.0 / (DEFAULT_LUT_LEN - 1) as f64;
        for (i, &v) in lut.iter().enumerate() {
            let expected = i as f64 * step;
            assert!(
                (v - expected).abs() <= step,
                "entry {i}: {v} vs {expected}"
            );
        }
    }

    #[test]
    fn test_correction_inverts_panel_response() {
        // Panel applies signal^1.3 in PQ space; correction followed by
        // the panel should land near the target
        let measured: Vec<f64> = (0..256).map(|i| (i as f64 / 255.0).powf(1.3)).collect();
        let lut = correction_lut_from_measured(&measured, None).unwrap();
        for i in (100..DEFAULT_LUT_LEN).step_by(371) {
            let target = i as f64 / (DEFAULT_LUT_LEN - 1) as f64;
            let panel_out = lut[i].powf(1.3);
            assert!(
                (panel_out - target).abs() < 2e-3,
                "i={i}: panel_out={panel_out} target={target}"
            );
        }
    }

    #[test]
    fn test_invalid_curves_rejected() {
        assert!(matches!(
            correction_lut_from_measured(&[0.5], None),
            Err(LutError::TooShort(1))
        ));
        assert!(matches!(
            correction_lut_from_measured(&[0.0, f64::NAN, 1.0], None),
            Err(LutError::NotFinite(1))
        ));
    }

    #[test]
    fn test_rgb_synthesis_matches_scalar() {
        let curve: Vec<f64> = (0..64).map(|i| (i as f64 / 63.0).powf(1.1)).collect();
        let targets = RgbLut::identity(DEFAULT_LUT_LEN);
        let rgb = correction_luts_rgb(&curve, &curve, &curve, &targets).unwrap();
        let scalar = correction_lut_from_measured(&curve, Some(&targets.red)).unwrap();
        assert_eq!(rgb.red, scalar);
        assert_eq!(rgb.green, scalar);
        assert_eq!(rgb.blue, scalar);
    }
}

//! Correction-matrix fit implementations.
//!
//! The unknowns are vec(C) in row-major order: for a sample pair
//! `(x, t)`, each output dimension k contributes one residual row
//! `(I3 ⊗ xᵀ)·vec(C) ≈ t`, i.e. the row has `x` placed at columns
//! `3k..3k+3`. The normal equations (9x9) and the white-locked KKT
//! system (12x12) are assembled directly from that structure.

use crate::{FitError, FitResult};
use hdrcal_color::xyz::{xyy_to_xyz, xyz_to_xy};
use hdrcal_math::{Mat3, Vec3, solve_dense};

/// Nominal luminance (nits) the drop-Y variants re-synthesize each
/// sample at; keeps the chromaticity fit free of luminance noise.
const DROP_Y_NITS: f64 = 10.0;

/// Ridge applied when the unregularized system is singular.
const FALLBACK_RIDGE: f64 = 1e-12;

/// Options shared by all fit variants.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Optional per-sample weights (same length as the sample set).
    pub weights: Option<Vec<f64>>,
    /// L2 regularization strength added to the normal-equation
    /// diagonal; 0 disables it.
    pub ridge: f64,
}

/// Accumulated normal equations: `AᵗA` (9x9) and `Aᵗb` (9).
struct NormalEquations {
    ata: [f64; 81],
    atb: [f64; 9],
}

fn accumulate(
    measured: &[Vec3],
    target: &[Vec3],
    opts: &FitOptions,
) -> FitResult<NormalEquations> {
    let n = measured.len();
    if n == 0 {
        return Err(FitError::NoSamples);
    }
    if target.len() != n {
        return Err(FitError::SampleCountMismatch {
            measured: n,
            target: target.len(),
        });
    }
    if let Some(w) = &opts.weights {
        if w.len() != n {
            return Err(FitError::WeightCountMismatch {
                weights: w.len(),
                samples: n,
            });
        }
    }

    let mut ne = NormalEquations {
        ata: [0.0; 81],
        atb: [0.0; 9],
    };
    for (idx, (&x, &t)) in measured.iter().zip(target).enumerate() {
        let w = opts.weights.as_ref().map_or(1.0, |w| w[idx]);
        let x = x.to_array();
        let t = t.to_array();
        for k in 0..3 {
            for i in 0..3 {
                let row = 3 * k + i;
                ne.atb[row] += w * x[i] * t[k];
                for j in 0..3 {
                    ne.ata[row * 9 + 3 * k + j] += w * x[i] * x[j];
                }
            }
        }
    }
    if opts.ridge > 0.0 {
        for i in 0..9 {
            ne.ata[i * 9 + i] += opts.ridge;
        }
    }
    Ok(ne)
}

fn solve_with_fallback(build: impl Fn(f64) -> (Vec<f64>, Vec<f64>)) -> FitResult<Mat3> {
    let (a, b) = build(0.0);
    let sol = match solve_dense(a, b) {
        Some(x) => x,
        None => {
            // Degenerate sample set: retry with a minimal ridge
            let (a, b) = build(FALLBACK_RIDGE);
            solve_dense(a, b).ok_or(FitError::SingularSystem)?
        }
    };
    let mut flat = [0.0; 9];
    flat.copy_from_slice(&sol[..9]);
    Ok(Mat3::from_flat(flat))
}

/// Fits a 3x3 matrix `C` minimizing `Σ ||C·measuredᵢ - targetᵢ||²`.
///
/// Solves the normal equations; if they are singular, retries once
/// with a minimal ridge, then fails with
/// [`FitError::SingularSystem`]. A singular system means a degenerate
/// sample set (collinear or duplicate samples), which must surface as
/// an error rather than a garbage matrix that would be persisted into
/// a live display profile.
///
/// # Example
///
/// ```rust
/// use hdrcal_fit::{FitOptions, fit_xyz_to_xyz};
/// use hdrcal_math::{Mat3, Vec3};
///
/// let truth = Mat3::diagonal(1.1, 0.9, 1.2);
/// let measured = vec![
///     Vec3::new(0.2, 0.1, 0.4),
///     Vec3::new(0.5, 0.6, 0.2),
///     Vec3::new(0.3, 0.8, 0.7),
/// ];
/// let target: Vec<Vec3> = measured.iter().map(|&m| truth * m).collect();
/// let c = fit_xyz_to_xyz(&measured, &target, &FitOptions::default()).unwrap();
/// assert!((c.m[0][0] - 1.1).abs() < 1e-9);
/// ```
pub fn fit_xyz_to_xyz(measured: &[Vec3], target: &[Vec3], opts: &FitOptions) -> FitResult<Mat3> {
    let ne = accumulate(measured, target, opts)?;
    solve_with_fallback(|extra_ridge| {
        let mut a = ne.ata.to_vec();
        if extra_ridge > 0.0 {
            for i in 0..9 {
                a[i * 9 + i] += extra_ridge;
            }
        }
        (a, ne.atb.to_vec())
    })
}

/// Fits a 3x3 matrix under the hard constraint `C·wm = wt`.
///
/// The constraint is exact (a KKT equality, solved together with the
/// least-squares objective), so the corrected white point matches the
/// reference to solver precision even though every other sample is
/// only least-squares optimal.
pub fn fit_xyz_to_xyz_wlock(
    measured: &[Vec3],
    target: &[Vec3],
    white_measured: Vec3,
    white_target: Vec3,
    opts: &FitOptions,
) -> FitResult<Mat3> {
    let ne = accumulate(measured, target, opts)?;
    let wm = white_measured.to_array();
    let wt = white_target.to_array();

    // KKT system:
    //   [ AᵗA  Ccᵀ ] [vec(C)]   [Aᵗb]
    //   [ Cc    0  ] [  λ   ] = [ wt ]
    // with Cc = I3 ⊗ wmᵀ (3x9).
    solve_with_fallback(|extra_ridge| {
        let n = 12;
        let mut a = vec![0.0; n * n];
        let mut b = vec![0.0; n];
        for i in 0..9 {
            for j in 0..9 {
                a[i * n + j] = ne.ata[i * 9 + j];
            }
            b[i] = ne.atb[i];
        }
        if extra_ridge > 0.0 {
            for i in 0..9 {
                a[i * n + i] += extra_ridge;
            }
        }
        for k in 0..3 {
            for j in 0..3 {
                a[(9 + k) * n + (3 * k + j)] = wm[j];
                a[(3 * k + j) * n + (9 + k)] = wm[j];
            }
            b[9 + k] = wt[k];
        }
        (a, b)
    })
}

/// Projects paired samples onto chromaticity and re-synthesizes them
/// at a fixed nominal luminance, dropping rows where either side has
/// an undefined or non-positive-y chromaticity.
///
/// Returns the rebuilt pairs plus the surviving weights.
fn drop_luminance(
    measured: &[Vec3],
    target: &[Vec3],
    opts: &FitOptions,
) -> FitResult<(Vec<Vec3>, Vec<Vec3>, Option<Vec<f64>>)> {
    let n = measured.len();
    if n == 0 {
        return Err(FitError::NoSamples);
    }
    if target.len() != n {
        return Err(FitError::SampleCountMismatch {
            measured: n,
            target: target.len(),
        });
    }
    if let Some(w) = &opts.weights {
        if w.len() != n {
            return Err(FitError::WeightCountMismatch {
                weights: w.len(),
                samples: n,
            });
        }
    }

    let mut m_fixed = Vec::with_capacity(n);
    let mut t_fixed = Vec::with_capacity(n);
    let mut w_fixed = opts.weights.as_ref().map(|_| Vec::with_capacity(n));
    for i in 0..n {
        let (mx, my) = xyz_to_xy(measured[i]);
        let (tx, ty) = xyz_to_xy(target[i]);
        let valid =
            mx.is_finite() && my.is_finite() && tx.is_finite() && ty.is_finite() && my > 0.0 && ty > 0.0;
        if !valid {
            continue;
        }
        m_fixed.push(xyy_to_xyz(mx, my, DROP_Y_NITS));
        t_fixed.push(xyy_to_xyz(tx, ty, DROP_Y_NITS));
        if let (Some(w_out), Some(w_in)) = (&mut w_fixed, &opts.weights) {
            w_out.push(w_in[i]);
        }
    }
    if m_fixed.is_empty() {
        return Err(FitError::NoValidSamples);
    }
    Ok((m_fixed, t_fixed, w_fixed))
}

/// Chromaticity-only unconstrained fit.
///
/// Luminance measurement noise must not bias the chromaticity
/// correction, so both sides of every pair are re-synthesized at a
/// fixed 10 cd/m² from their (x, y) alone before fitting. Rows whose
/// chromaticity is undefined are dropped; if nothing survives the fit
/// fails with [`FitError::NoValidSamples`].
pub fn fit_xyz_to_xyz_drop_y(
    measured: &[Vec3],
    target: &[Vec3],
    opts: &FitOptions,
) -> FitResult<Mat3> {
    let (m, t, w) = drop_luminance(measured, target, opts)?;
    let inner = FitOptions {
        weights: w,
        ridge: opts.ridge,
    };
    fit_xyz_to_xyz(&m, &t, &inner)
}

/// Chromaticity-only white-locked fit.
///
/// The drop-Y preprocessing of [`fit_xyz_to_xyz_drop_y`] combined with
/// the hard white constraint of [`fit_xyz_to_xyz_wlock`]; the white
/// pair is projected onto chromaticity the same way as the samples.
pub fn fit_xyz_to_xyz_wlock_drop_y(
    measured: &[Vec3],
    target: &[Vec3],
    white_measured: Vec3,
    white_target: Vec3,
    opts: &FitOptions,
) -> FitResult<Mat3> {
    let (m, t, w) = drop_luminance(measured, target, opts)?;
    let (wmx, wmy) = xyz_to_xy(white_measured);
    let (wtx, wty) = xyz_to_xy(white_target);
    let wm = xyy_to_xyz(wmx, wmy, DROP_Y_NITS);
    let wt = xyy_to_xyz(wtx, wty, DROP_Y_NITS);
    let inner = FitOptions {
        weights: w,
        ridge: opts.ridge,
    };
    fit_xyz_to_xyz_wlock(&m, &t, wm, wt, &inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cloud() -> Vec<Vec3> {
        // Non-degenerate spread of "measured" XYZ points
        (0..10)
            .map(|i| {
                let f = i as f64;
                Vec3::new(
                    0.05 + 0.03 * f,
                    0.04 + 0.025 * f + 0.01 * (f * 0.7).sin(),
                    0.06 + 0.02 * f + 0.015 * (f * 1.3).cos(),
                )
            })
            .collect()
    }

    #[test]
    fn test_exact_recovery() {
        let truth = Mat3::from_rows([
            [1.08, -0.03, 0.02],
            [0.01, 0.97, -0.02],
            [-0.01, 0.04, 1.12],
        ]);
        let measured = sample_cloud();
        let target: Vec<Vec3> = measured.iter().map(|&m| truth * m).collect();
        let c = fit_xyz_to_xyz(&measured, &target, &FitOptions::default()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!((c.m[i][j] - truth.m[i][j]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_white_lock_exactness() {
        // Perturbed targets so the unconstrained optimum does NOT pass
        // through the white pair
        let measured = sample_cloud();
        let truth = Mat3::from_rows([[1.1, 0.0, 0.05], [0.02, 0.9, 0.0], [0.0, 0.05, 1.2]]);
        let target: Vec<Vec3> = measured
            .iter()
            .enumerate()
            .map(|(i, &m)| truth * m + Vec3::new(0.001, -0.001, 0.002) * ((i % 3) as f64))
            .collect();
        let wm = Vec3::new(0.012, 0.0128, 0.0136);
        let wt = Vec3::new(0.0365, 0.0384, 0.0418);

        let locked =
            fit_xyz_to_xyz_wlock(&measured, &target, wm, wt, &FitOptions::default()).unwrap();
        let got = locked * wm;
        assert!((got.x - wt.x).abs() < 1e-9);
        assert!((got.y - wt.y).abs() < 1e-9);
        assert!((got.z - wt.z).abs() < 1e-9);

        // The plain fit on the same data does not satisfy the lock
        let plain = fit_xyz_to_xyz(&measured, &target, &FitOptions::default()).unwrap();
        let free = plain * wm;
        assert!((free.x - wt.x).abs() > 1e-6 || (free.y - wt.y).abs() > 1e-6);
    }

    #[test]
    fn test_wlock_regression_measured_panel() {
        // Sample set captured from a real panel measurement run; the
        // expected matrix is the reference solver's output on the same
        // data.
        let measured: Vec<Vec3> = [
            [0.0078652003, 0.008075561, 0.0068187385],
            [0.0069408186, 0.0087301989, 0.0051397427],
            [0.0079000496, 0.0092610949, 0.0047605614],
            [0.0065731655, 0.0071697741, 0.0098863041],
            [0.0075095920, 0.0089061028, 0.0101065877],
            [0.0056101579, 0.0044552922, 0.0027226421],
            [0.0078781780, 0.0089717320, 0.0041017991],
            [0.0061226825, 0.0051003034, 0.0095902299],
            [0.0046982521, 0.0031712193, 0.0001316159],
            [4.40549e-5, 4.57357e-5, 6.48951e-5],
            [4.40254e-5, 4.57186e-5, 6.48683e-5],
            [4.40238e-5, 4.56963e-5, 6.48454e-5],
            [4.40215e-5, 4.56914e-5, 6.48329e-5],
            [0.0055001203, 0.0080246046, 0.0047528409],
            [0.0053988231, 0.0034796068, 0.0039944026],
            [0.0058462124, 0.0062222075, 0.0065536916],
            [0.0082832403, 0.0088134912, 0.0093092413],
            [0.0100569658, 0.0107003057, 0.0112877289],
            [0.0114737568, 0.0122096790, 0.0128600238],
        ]
        .iter()
        .map(|a| Vec3::from_array(*a))
        .collect();
        let target: Vec<Vec3> = [
            [0.015766058385192260, 0.014793345271452893, 0.009970309415828525],
            [0.010926748404364870, 0.017306340640453676, 0.005700912210972972],
            [0.015499428779093122, 0.019454179936645232, 0.004993372673676908],
            [0.010122452212660907, 0.011328531625233272, 0.021623280896833090],
            [0.012364366516017099, 0.017581398801256382, 0.022224557535119344],
            [0.011399097897517363, 0.006361368324091146, 0.001995336027121758],
            [0.016239494708729617, 0.018515338385249918, 0.003818788541957795],
            [0.010451866093190930, 0.006637316424143144, 0.021056314173143770],
            [0.010579597633660915, 0.004978634180546313, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.006487197794573525, 0.015243580002886758, 0.004965509423006897],
            [0.011279869700242579, 0.005250266624112910, 0.003978717676085563],
            [0.008110132510765956, 0.008532886460000000, 0.009292806135617022],
            [0.016220265021531913, 0.017065772920000000, 0.018585612271234044],
            [0.024330397532297870, 0.025598659380000000, 0.027878418406851062],
            [0.032440530043063825, 0.034131545840000000, 0.037171224542468090],
        ]
        .iter()
        .map(|a| Vec3::from_array(*a))
        .collect();
        let wm = Vec3::new(0.0121108736, 0.0128726612, 0.0136013749);
        let wt = Vec3::new(0.0364955962984468, 0.03839798907, 0.041817627610276596);

        let c = fit_xyz_to_xyz_wlock(&measured, &target, wm, wt, &FitOptions::default()).unwrap();
        let expected = [
            3.046855885594285,
            -1.1025808519457923,
            1.0231538998117535,
            -0.5791400694145858,
            2.383822764075156,
            1.0895824666411102,
            -0.31415750390541,
            -0.9171359761187199,
            4.249629148091815,
        ];
        let flat = c.to_flat();
        for i in 0..9 {
            assert!(
                (flat[i] - expected[i]).abs() < 1e-6,
                "element {i}: {} vs {}",
                flat[i],
                expected[i]
            );
        }
    }

    #[test]
    fn test_drop_y_ignores_luminance_noise() {
        // A luminance-preserving chromaticity transform, applied to
        // samples measured at wildly different luminances: the drop-Y
        // fit must recover it exactly because only (x, y) survives the
        // preprocessing.
        let truth = Mat3::from_rows([[1.05, 0.02, 0.0], [0.0, 1.0, 0.0], [0.01, 0.0, 0.95]]);
        let chroma = [
            (0.35, 0.35),
            (0.30, 0.50),
            (0.25, 0.30),
            (0.45, 0.40),
            (0.33, 0.42),
        ];
        let measured: Vec<Vec3> = chroma
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| hdrcal_color::xyz::xyy_to_xyz(x, y, 50.0 + 200.0 * i as f64))
            .collect();
        // Targets share the transformed chromaticity but carry their
        // own arbitrary luminance scales
        let target: Vec<Vec3> = chroma
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                (truth * hdrcal_color::xyz::xyy_to_xyz(x, y, 10.0)) * (1.0 + 0.5 * i as f64)
            })
            .collect();

        let c = fit_xyz_to_xyz_drop_y(&measured, &target, &FitOptions::default()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (c.m[i][j] - truth.m[i][j]).abs() < 1e-9,
                    "({i},{j}): {} vs {}",
                    c.m[i][j],
                    truth.m[i][j]
                );
            }
        }
    }

    #[test]
    fn test_drop_y_all_invalid_fails() {
        let zeros = vec![Vec3::ZERO; 4];
        assert!(matches!(
            fit_xyz_to_xyz_drop_y(&zeros, &zeros, &FitOptions::default()),
            Err(FitError::NoValidSamples)
        ));
    }

    #[test]
    fn test_empty_and_mismatched_inputs() {
        assert!(matches!(
            fit_xyz_to_xyz(&[], &[], &FitOptions::default()),
            Err(FitError::NoSamples)
        ));
        let a = vec![Vec3::ONE; 3];
        let b = vec![Vec3::ONE; 2];
        assert!(matches!(
            fit_xyz_to_xyz(&a, &b, &FitOptions::default()),
            Err(FitError::SampleCountMismatch { .. })
        ));
    }

    #[test]
    fn test_weighted_fit_prefers_heavy_samples() {
        // Two inconsistent constraints on a diagonal-ish system; the
        // heavily weighted one should dominate
        let measured = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let target = vec![
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let opts = FitOptions {
            weights: Some(vec![100.0, 1.0, 1.0, 1.0]),
            ridge: 0.0,
        };
        let c = fit_xyz_to_xyz(&measured, &target, &opts).unwrap();
        assert!((c.m[0][0] - 2.0).abs() < 0.02);
    }
}

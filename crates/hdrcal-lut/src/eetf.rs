//! BT.2390 EETF (electro-electrical transfer function).
//!
//! Rolls mastering-peak PQ signal off into a display's achievable
//! range with a cubic Hermite knee plus a black-lift term. The formula
//! is standard-mandated; constants and branch structure follow
//! ITU-R BT.2390 step 3.1/3.2 exactly.

use hdrcal_transfer::pq;

/// Applies the BT.2390 EETF to a PQ-encoded value.
///
/// * `v` - PQ signal to adjust, [0, 1]
/// * `source_black`, `source_white` - mastering black/white (nits)
/// * `target_black`, `target_white` - display black/white (nits)
///
/// Values below the knee start `KS = 1.5 * maxLum - 0.5` pass through
/// unchanged; values above it blend through the Hermite spline toward
/// the target peak; the black lift `b * (1 - E)^4` raises the toe to
/// the display's minimum.
///
/// # Example
///
/// ```rust
/// use hdrcal_lut::eetf::bt2390_eetf;
///
/// // 4000-nit master on a 800-nit panel: peak maps to panel peak
/// let peak = bt2390_eetf(1.0, 0.0, 10000.0, 0.0, 800.0);
/// let panel_peak = hdrcal_transfer::pq::oetf(800.0);
/// assert!((peak - panel_peak).abs() < 1e-9);
/// ```
pub fn bt2390_eetf(
    v: f64,
    source_black: f64,
    source_white: f64,
    target_black: f64,
    target_white: f64,
) -> f64 {
    let vb = pq::oetf(source_black);
    let vw = pq::oetf(source_white);
    let span = vw - vb;

    // Normalize into EETF space [0, 1]
    let e1 = (v - vb) / span;
    let min_lum = (pq::oetf(target_black) - vb) / span;
    let max_lum = (pq::oetf(target_white) - vb) / span;

    let ks = 1.5 * max_lum - 0.5;
    let b = min_lum;

    // Hermite blend above the knee; the KS == 1 guard avoids the
    // 0/0 at a target peak equal to the source peak
    let t = |a: f64| if ks != 1.0 { (a - ks) / (1.0 - ks) } else { 0.0 };
    let p = |x: f64| {
        let tx = t(x);
        (2.0 * tx.powi(3) - 3.0 * tx.powi(2) + 1.0) * ks
            + (tx.powi(3) - 2.0 * tx.powi(2) + tx) * (1.0 - ks)
            + (-2.0 * tx.powi(3) + 3.0 * tx.powi(2)) * max_lum
    };

    let e2 = if e1 < ks {
        e1
    } else if e1 <= 1.0 {
        p(e1)
    } else {
        e1
    };
    let e3 = if (0.0..=1.0).contains(&e2) {
        e2 + b * (1.0 - e2).powi(4)
    } else {
        e2
    };

    // Back into PQ signal space
    e3 * span + vb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_ranges_match() {
        // Target range equals source range: below-knee values pass
        // through except for the (zero) black lift
        for i in 0..=10 {
            let v = i as f64 / 10.0;
            let out = bt2390_eetf(v, 0.0, 10000.0, 0.0, 10000.0);
            assert!((out - v).abs() < 1e-9, "v={v}, out={out}");
        }
    }

    #[test]
    fn test_peak_maps_to_target_peak() {
        let out = bt2390_eetf(1.0, 0.0, 10000.0, 0.0, 600.0);
        assert!((out - pq::oetf(600.0)).abs() < 1e-9);
    }

    #[test]
    fn test_black_lift_raises_toe() {
        // Near-black signal on a panel with a raised black floor gets
        // lifted by b * (1 - E)^4
        let v = 0.01;
        let out = bt2390_eetf(v, 0.0, 10000.0, 0.05, 1000.0);
        assert!(out > v);
        // The lift fades toward the top of the range
        let hi = 0.6;
        let out_hi = bt2390_eetf(hi, 0.0, 10000.0, 0.05, 1000.0);
        assert!(out_hi - hi < out - v);
    }

    #[test]
    fn test_below_knee_unchanged() {
        // 1000-nit target: KS well above mid-gray
        let max_lum = pq::oetf(1000.0);
        let ks = 1.5 * max_lum - 0.5;
        let v = ks * 0.5;
        let out = bt2390_eetf(v, 0.0, 10000.0, 0.0, 1000.0);
        assert!((out - v).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic() {
        let mut prev = -1.0;
        for i in 0..=1000 {
            let v = i as f64 / 1000.0;
            let out = bt2390_eetf(v, 0.0, 10000.0, 0.01, 750.0);
            assert!(out >= prev - 1e-12, "not monotonic at v={v}");
            prev = out;
        }
    }
}

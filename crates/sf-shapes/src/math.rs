//! Numerically-stable scalar helpers and the Gauss hypergeometric function.

use sf_core::{Error, Result};
use statrs::function::gamma::gamma;

/// Stable `log(1 + exp(x))`.
///
/// Branchless: `log(1+exp(x)) = max(x,0) + log(1+exp(-|x|))`.
#[inline]
pub fn log1pexp(x: f64) -> f64 {
    let e = (-x.abs()).exp(); // always in (0, 1], no overflow
    x.max(0.0) + e.ln_1p()
}

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    // x >= 0: sigmoid = 1/(1+exp(-x)) = recip
    // x <  0: sigmoid = exp(x)/(1+exp(x)) = e/(1+e) = e*recip
    if x >= 0.0 { recip } else { e * recip }
}

/// Continuation prefactors involve `Γ(b-a)` and `Γ(a-b)`; within this window
/// of an integer `b-a` the two terms cancel catastrophically.
const DEGENERATE_EPS: f64 = 1e-8;

const SERIES_TOL: f64 = 1e-15;
const MAX_TERMS: usize = 1_000;

/// Gauss hypergeometric function `₂F₁(a, b; c; w)` for real `w < 1`.
///
/// Evaluation strategy:
/// - `-1/2 <= w < 1`: direct power series (term recurrence).
/// - `-1 < w < -1/2`: Pfaff transform `(1-w)^{-a}·₂F₁(a, c-b; c; w/(w-1))`,
///   which pulls the series argument back into `[0, 1/2]` where the direct
///   series would converge slowly.
/// - `w <= -1`: analytic continuation in `u = 1/(1-w)`,
///
///   `Γ(c)Γ(b-a)/(Γ(b)Γ(c-a))·(1-w)^{-a}·₂F₁(a, c-b; a-b+1; u)
///    + Γ(c)Γ(a-b)/(Γ(a)Γ(c-b))·(1-w)^{-b}·₂F₁(b, c-a; b-a+1; u)`.
///
/// Failures (series non-convergence, gamma poles, non-finite results) are
/// reported as [`Error::Computation`] with the arguments that produced them,
/// never as a silent zero.
pub fn hyp2f1(a: f64, b: f64, c: f64, w: f64) -> Result<f64> {
    if !(a.is_finite() && b.is_finite() && c.is_finite() && w.is_finite()) {
        return Err(Error::Computation(format!(
            "2F1 requires finite arguments, got a={a}, b={b}, c={c}, w={w}"
        )));
    }
    if c <= 0.0 && (c - c.round()).abs() < DEGENERATE_EPS {
        return Err(Error::Computation(format!("2F1 undefined: c={c} is a non-positive integer")));
    }
    if w >= 1.0 {
        return Err(Error::Computation(format!("2F1 argument outside domain: w={w} >= 1")));
    }

    let h = if w <= -1.0 {
        hyp2f1_continuation(a, b, c, w)?
    } else if w < -0.5 {
        (1.0 - w).powf(-a) * hyp2f1_series(a, c - b, c, w / (w - 1.0))?
    } else {
        hyp2f1_series(a, b, c, w)?
    };

    if h.is_finite() {
        Ok(h)
    } else {
        Err(Error::Computation(format!(
            "2F1 evaluation is not finite: a={a}, b={b}, c={c}, w={w}"
        )))
    }
}

/// Direct power series `Σ_k (a)_k (b)_k / (c)_k · w^k / k!`.
fn hyp2f1_series(a: f64, b: f64, c: f64, w: f64) -> Result<f64> {
    let mut term = 1.0f64;
    let mut sum = 1.0f64;
    for k in 0..MAX_TERMS {
        let kf = k as f64;
        term *= (a + kf) * (b + kf) / ((c + kf) * (kf + 1.0)) * w;
        sum += term;
        if term.abs() < SERIES_TOL * sum.abs().max(1.0) {
            return Ok(sum);
        }
    }
    Err(Error::Computation(format!(
        "2F1 series did not converge after {MAX_TERMS} terms (a={a}, b={b}, c={c}, w={w})"
    )))
}

/// Analytic continuation for `w <= -1` via the reciprocal-complement argument
/// `u = 1/(1-w)`, which lies in `(0, 1/2]`.
fn hyp2f1_continuation(a: f64, b: f64, c: f64, w: f64) -> Result<f64> {
    let ba = b - a;
    if (ba - ba.round()).abs() < DEGENERATE_EPS {
        return Err(Error::Computation(format!(
            "2F1 continuation degenerate: b-a={ba} is an integer (a={a}, b={b}, c={c}, w={w})"
        )));
    }

    let u = 1.0 / (1.0 - w);
    let l = (1.0 - w).ln();

    let t1 = gamma(c) * gamma(ba) / (gamma(b) * gamma(c - a))
        * (-a * l).exp()
        * hyp2f1_series(a, c - b, 1.0 - ba, u)?;
    let t2 = gamma(c) * gamma(-ba) / (gamma(a) * gamma(c - b))
        * (-b * l).exp()
        * hyp2f1_series(b, c - a, 1.0 + ba, u)?;

    Ok(t1 + t2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log1pexp_matches_naive_moderate_values() {
        let xs: [f64; 7] = [-10.0, -2.0, -0.1, 0.0, 0.1, 2.0, 10.0];
        for x in xs {
            let naive = (1.0 + x.exp()).ln();
            assert!((naive - log1pexp(x)).abs() < 1e-12, "x={x}");
        }
        assert!((log1pexp(1e6) - 1e6).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_bounds_and_symmetry() {
        let xs: [f64; 7] = [-50.0, -10.0, -1.0, 0.0, 1.0, 10.0, 50.0];
        for x in xs {
            let s = sigmoid(x);
            assert!((0.0..=1.0).contains(&s), "sigmoid({x})={s}");
            assert!((s + sigmoid(-x) - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_hyp2f1_at_zero_is_one() {
        assert_relative_eq!(hyp2f1(1.0, 0.3, 1.3, 0.0).unwrap(), 1.0, epsilon = 1e-15);
    }

    /// `₂F₁(1, 1/2; 3/2; -x²) = atan(x)/x` on the direct-series branch.
    #[test]
    fn test_hyp2f1_arctan_series_branch() {
        for x in [0.1, 0.5, 0.7] {
            let h = hyp2f1(1.0, 0.5, 1.5, -x * x).unwrap();
            assert_relative_eq!(h, x.atan() / x, epsilon = 1e-12);
        }
    }

    /// Same identity with `0.5 < x² < 1` exercises the Pfaff transform.
    #[test]
    fn test_hyp2f1_arctan_pfaff_branch() {
        for x in [0.8, 0.9, 0.99] {
            let h = hyp2f1(1.0, 0.5, 1.5, -x * x).unwrap();
            assert_relative_eq!(h, x.atan() / x, epsilon = 1e-12);
        }
    }

    /// Same identity with `x > 1` exercises the analytic continuation.
    #[test]
    fn test_hyp2f1_arctan_continuation_branch() {
        for x in [1.1, 2.0, 10.0, 100.0] {
            let h = hyp2f1(1.0, 0.5, 1.5, -x * x).unwrap();
            assert_relative_eq!(h, x.atan() / x, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_hyp2f1_rejects_domain_and_degenerate_inputs() {
        assert!(hyp2f1(1.0, 0.5, 1.5, 1.0).is_err());
        assert!(hyp2f1(1.0, 0.5, 0.0, 0.3).is_err());
        // b - a integer makes the continuation prefactors singular.
        assert!(hyp2f1(1.0, 2.0, 3.5, -4.0).is_err());
    }
}

use crate::pdf::{Range, ShapePdf};
use sf_core::{Error, Result};
use statrs::function::erf::erf;

use std::f64::consts::FRAC_1_SQRT_2;

/// `sqrt(π/2)`, the Gaussian-core antiderivative prefactor.
const SQRT_PI_OVER_2: f64 = 1.253_314_137_315_500_3;

/// Below this distance from `n = 1` the power-law antiderivative is replaced
/// by its logarithmic closed form; the power form divides by `n - 1`.
const N_SINGULAR_EPS: f64 = 1e-5;

/// Fold a width or tail parameter through its absolute value.
///
/// Negative values are minimizer line-search artifacts, not domain errors;
/// the density is symmetric in their sign. A hard zero cannot be folded.
#[inline]
fn fold_abs(shape: &str, label: &str, v: f64) -> Result<f64> {
    if !v.is_finite() {
        return Err(Error::Validation(format!("{shape}: {label} must be finite, got {v}")));
    }
    let v = v.abs();
    if v == 0.0 {
        return Err(Error::Validation(format!("{shape}: {label} must be nonzero")));
    }
    Ok(v)
}

/// Canonical tail offset `b = n/α - α`; the tail reads `a·(b+z)^{-n}` in the
/// mirrored coordinate `z = |t| >= α`, with `a = (n/α)^n·exp(-α²/2)`.
#[inline]
fn tail_offset(alpha: f64, n: f64) -> f64 {
    n / alpha - alpha
}

/// Tail density at distance `z >= α` from the peak, in width units.
///
/// Evaluated in log space: `(n/α)^n` alone overflows for large `n`, while the
/// combined value is bounded by the core join value `exp(-α²/2)`.
#[inline]
fn tail_value(z: f64, alpha: f64, n: f64) -> f64 {
    let b = tail_offset(alpha, n);
    (-0.5 * alpha * alpha + n * ((n / alpha).ln() - (b + z).ln())).exp()
}

/// Definite integral of the tail density over `[z0, z1]` (`α <= z0 <= z1`),
/// in width units.
///
/// Power-law antiderivative `a·(b+z)^{1-n}/(1-n)` away from `n = 1`;
/// logarithmic closed form `a·ln(b+z)` inside the `|n-1| < 1e-5` window where
/// the power form is numerically singular.
fn tail_integral(z0: f64, z1: f64, alpha: f64, n: f64) -> f64 {
    let b = tail_offset(alpha, n);
    if (n - 1.0).abs() < N_SINGULAR_EPS {
        let a = (-0.5 * alpha * alpha + n * (n / alpha).ln()).exp();
        a * ((b + z1).ln() - (b + z0).ln())
    } else {
        // a·(b+z)^{1-n} = (b+z)·tail_value(z), keeping the evaluation in the
        // overflow-safe log-space path.
        ((b + z1) * tail_value(z1, alpha, n) - (b + z0) * tail_value(z0, alpha, n)) / (1.0 - n)
    }
}

/// Gaussian-core integral `∫ exp(-t²/2) dt` over `[t0, t1]`, in width units.
#[inline]
fn core_integral(t0: f64, t1: f64) -> f64 {
    SQRT_PI_OVER_2 * (erf(t1 * FRAC_1_SQRT_2) - erf(t0 * FRAC_1_SQRT_2))
}

/// Single-sided Crystal Ball: Gaussian core with one power-law tail on the
/// low side, the classic radiative-tail resolution model.
///
/// With `t = (x - x0)/σ`:
/// - `t < -α`: `a·(b - t)^{-n}` with `a = (n/α)^n·exp(-α²/2)`, `b = n/α - α`
/// - otherwise: `exp(-t²/2)`
///
/// The core evaluates to exactly 1 at `x = x0`.
///
/// **Shape parameters (4):** `[x0, sigma, alpha, n]`. `sigma`, `alpha` and
/// `n` are used through their absolute values.
#[derive(Debug, Clone)]
pub struct CrystalBallPdf {
    observables: [String; 1],
}

impl CrystalBallPdf {
    /// Create a single-sided Crystal Ball over the given observable.
    pub fn new(observable: impl Into<String>) -> Self {
        Self { observables: [observable.into()] }
    }

    fn prepare(&self, params: &[f64]) -> Result<(f64, f64, f64, f64)> {
        if params.len() != 4 {
            return Err(Error::Validation(format!(
                "CrystalBallPdf expects 4 params (x0, sigma, alpha, n), got {}",
                params.len()
            )));
        }
        let x0 = params[0];
        if !x0.is_finite() {
            return Err(Error::Validation(format!(
                "CrystalBallPdf: x0 must be finite, got {x0}"
            )));
        }
        let sigma = fold_abs("CrystalBallPdf", "sigma", params[1])?;
        let alpha = fold_abs("CrystalBallPdf", "alpha", params[2])?;
        let n = fold_abs("CrystalBallPdf", "n", params[3])?;
        Ok((x0, sigma, alpha, n))
    }
}

impl ShapePdf for CrystalBallPdf {
    fn n_params(&self) -> usize {
        4
    }

    fn observables(&self) -> &[String] {
        &self.observables
    }

    fn density(&self, x: f64, params: &[f64]) -> Result<f64> {
        let (x0, sigma, alpha, n) = self.prepare(params)?;
        let t = (x - x0) / sigma;
        if t < -alpha {
            Ok(tail_value(-t, alpha, n))
        } else {
            Ok((-0.5 * t * t).exp())
        }
    }

    fn analytic_integral(&self, observable: &str, range: Range, params: &[f64]) -> Result<f64> {
        if !self.supports_analytic_integral(observable) {
            return Err(Error::NotImplemented(format!(
                "CrystalBallPdf has no analytic integral over '{observable}'"
            )));
        }
        range.validate("CrystalBallPdf")?;
        let (x0, sigma, alpha, n) = self.prepare(params)?;

        let tmin = (range.low - x0) / sigma;
        let tmax = (range.high - x0) / sigma;

        let mut acc = 0.0;
        if tmin < -alpha {
            let t_hi = tmax.min(-alpha);
            acc += tail_integral(-t_hi, -tmin, alpha, n);
        }
        let c0 = tmin.max(-alpha);
        if c0 < tmax {
            acc += core_integral(c0, tmax);
        }
        Ok(sigma * acc)
    }

    fn max_value(&self, params: &[f64], _support: Range) -> Result<f64> {
        self.prepare(params)?;
        Ok(1.0)
    }
}

/// Double-sided Crystal Ball: one common width, independently tunable
/// power-law tails on both sides of the Gaussian core.
///
/// With `t = (x - x0)/σ`:
/// - `t < -α_low`: low tail with transition `α_low` and order `n_low`
/// - `-α_low <= t < α_high`: `exp(-t²/2)`
/// - `t >= α_high`: high tail with `α_high`, `n_high`
///
/// Both tails join the core with matched value, so the density is continuous
/// and peaks at exactly 1 at `x = x0`.
///
/// **Shape parameters (6):** `[x0, sigma, alpha_low, n_low, alpha_high,
/// n_high]`. Widths and tail parameters are used through their absolute
/// values.
#[derive(Debug, Clone)]
pub struct DoubleSidedCrystalBallPdf {
    observables: [String; 1],
}

impl DoubleSidedCrystalBallPdf {
    /// Create a double-sided Crystal Ball over the given observable.
    pub fn new(observable: impl Into<String>) -> Self {
        Self { observables: [observable.into()] }
    }

    fn prepare(&self, params: &[f64]) -> Result<(f64, f64, f64, f64, f64, f64)> {
        if params.len() != 6 {
            return Err(Error::Validation(format!(
                "DoubleSidedCrystalBallPdf expects 6 params (x0, sigma, alpha_low, n_low, alpha_high, n_high), got {}",
                params.len()
            )));
        }
        let x0 = params[0];
        if !x0.is_finite() {
            return Err(Error::Validation(format!(
                "DoubleSidedCrystalBallPdf: x0 must be finite, got {x0}"
            )));
        }
        let sigma = fold_abs("DoubleSidedCrystalBallPdf", "sigma", params[1])?;
        let alpha_low = fold_abs("DoubleSidedCrystalBallPdf", "alpha_low", params[2])?;
        let n_low = fold_abs("DoubleSidedCrystalBallPdf", "n_low", params[3])?;
        let alpha_high = fold_abs("DoubleSidedCrystalBallPdf", "alpha_high", params[4])?;
        let n_high = fold_abs("DoubleSidedCrystalBallPdf", "n_high", params[5])?;
        Ok((x0, sigma, alpha_low, n_low, alpha_high, n_high))
    }
}

impl ShapePdf for DoubleSidedCrystalBallPdf {
    fn n_params(&self) -> usize {
        6
    }

    fn observables(&self) -> &[String] {
        &self.observables
    }

    fn density(&self, x: f64, params: &[f64]) -> Result<f64> {
        let (x0, sigma, al, nl, ah, nh) = self.prepare(params)?;
        let t = (x - x0) / sigma;
        if t < -al {
            Ok(tail_value(-t, al, nl))
        } else if t < ah {
            Ok((-0.5 * t * t).exp())
        } else {
            Ok(tail_value(t, ah, nh))
        }
    }

    fn analytic_integral(&self, observable: &str, range: Range, params: &[f64]) -> Result<f64> {
        if !self.supports_analytic_integral(observable) {
            return Err(Error::NotImplemented(format!(
                "DoubleSidedCrystalBallPdf has no analytic integral over '{observable}'"
            )));
        }
        range.validate("DoubleSidedCrystalBallPdf")?;
        let (x0, sigma, al, nl, ah, nh) = self.prepare(params)?;

        let tmin = (range.low - x0) / sigma;
        let tmax = (range.high - x0) / sigma;

        // Decompose [tmin, tmax] into its overlaps with the three pieces.
        // Each closed form is only valid on its own piece, so no interval may
        // be clamped into a neighboring one.
        let mut acc = 0.0;
        if tmin < -al {
            let t_hi = tmax.min(-al);
            acc += tail_integral(-t_hi, -tmin, al, nl);
        }
        let c0 = tmin.max(-al);
        let c1 = tmax.min(ah);
        if c0 < c1 {
            acc += core_integral(c0, c1);
        }
        let t_lo = tmin.max(ah);
        if t_lo < tmax {
            acc += tail_integral(t_lo, tmax, ah, nh);
        }
        Ok(sigma * acc)
    }

    fn max_value(&self, params: &[f64], _support: Range) -> Result<f64> {
        self.prepare(params)?;
        Ok(1.0)
    }
}

/// Bifurcated double-sided Crystal Ball: independent widths on the two sides
/// of the peak in addition to independent tails.
///
/// With `t = (x - x0)/σ_L` below the peak and `(x - x0)/σ_R` above it, the
/// three-branch shape is the same as [`DoubleSidedCrystalBallPdf`]. The raw
/// sign of `alpha_left` is a side selector: a negative value swaps the left
/// and right tail descriptors before absolute values are applied, letting a
/// minimizer float which side carries the heavier tail without a discrete
/// switch.
///
/// **Shape parameters (7):** `[x0, sigma_left, sigma_right, alpha_left,
/// n_left, alpha_right, n_right]`.
#[derive(Debug, Clone)]
pub struct BifurcatedCrystalBallPdf {
    observables: [String; 1],
}

/// Folded bifurcated parameter set, after side-swap and absolute values.
struct BifurcatedParams {
    x0: f64,
    sigma_l: f64,
    sigma_r: f64,
    alpha_l: f64,
    n_l: f64,
    alpha_r: f64,
    n_r: f64,
}

impl BifurcatedCrystalBallPdf {
    /// Create a bifurcated Crystal Ball over the given observable.
    pub fn new(observable: impl Into<String>) -> Self {
        Self { observables: [observable.into()] }
    }

    fn prepare(&self, params: &[f64]) -> Result<BifurcatedParams> {
        if params.len() != 7 {
            return Err(Error::Validation(format!(
                "BifurcatedCrystalBallPdf expects 7 params (x0, sigma_left, sigma_right, alpha_left, n_left, alpha_right, n_right), got {}",
                params.len()
            )));
        }
        let x0 = params[0];
        if !x0.is_finite() {
            return Err(Error::Validation(format!(
                "BifurcatedCrystalBallPdf: x0 must be finite, got {x0}"
            )));
        }
        if !params[3].is_finite() {
            return Err(Error::Validation(format!(
                "BifurcatedCrystalBallPdf: alpha_left must be finite, got {}",
                params[3]
            )));
        }
        // The raw sign of alpha_left selects which side carries which tail.
        let (al_raw, nl_raw, ar_raw, nr_raw) = if params[3] < 0.0 {
            (params[5], params[6], params[3], params[4])
        } else {
            (params[3], params[4], params[5], params[6])
        };
        Ok(BifurcatedParams {
            x0,
            sigma_l: fold_abs("BifurcatedCrystalBallPdf", "sigma_left", params[1])?,
            sigma_r: fold_abs("BifurcatedCrystalBallPdf", "sigma_right", params[2])?,
            alpha_l: fold_abs("BifurcatedCrystalBallPdf", "alpha_left", al_raw)?,
            n_l: fold_abs("BifurcatedCrystalBallPdf", "n_left", nl_raw)?,
            alpha_r: fold_abs("BifurcatedCrystalBallPdf", "alpha_right", ar_raw)?,
            n_r: fold_abs("BifurcatedCrystalBallPdf", "n_right", nr_raw)?,
        })
    }
}

impl ShapePdf for BifurcatedCrystalBallPdf {
    fn n_params(&self) -> usize {
        7
    }

    fn observables(&self) -> &[String] {
        &self.observables
    }

    fn density(&self, x: f64, params: &[f64]) -> Result<f64> {
        let p = self.prepare(params)?;
        let t = if x < p.x0 { (x - p.x0) / p.sigma_l } else { (x - p.x0) / p.sigma_r };
        if t < -p.alpha_l {
            Ok(tail_value(-t, p.alpha_l, p.n_l))
        } else if t < p.alpha_r {
            Ok((-0.5 * t * t).exp())
        } else {
            Ok(tail_value(t, p.alpha_r, p.n_r))
        }
    }

    fn analytic_integral(&self, observable: &str, range: Range, params: &[f64]) -> Result<f64> {
        if !self.supports_analytic_integral(observable) {
            return Err(Error::NotImplemented(format!(
                "BifurcatedCrystalBallPdf has no analytic integral over '{observable}'"
            )));
        }
        range.validate("BifurcatedCrystalBallPdf")?;
        let p = self.prepare(params)?;

        // Each bound is expressed in its own side's width units; sign
        // comparisons across the two scales stay consistent because both
        // scales are positive.
        let tmin =
            if range.low < p.x0 { (range.low - p.x0) / p.sigma_l } else { (range.low - p.x0) / p.sigma_r };
        let tmax = if range.high < p.x0 {
            (range.high - p.x0) / p.sigma_l
        } else {
            (range.high - p.x0) / p.sigma_r
        };

        let mut acc = 0.0;
        if tmin < -p.alpha_l {
            let t_hi = tmax.min(-p.alpha_l);
            acc += p.sigma_l * tail_integral(-t_hi, -tmin, p.alpha_l, p.n_l);
        }
        let c0 = tmin.max(-p.alpha_l);
        let c1 = tmax.min(p.alpha_r);
        if c0 < c1 {
            // Exact decomposition of the two core antiderivatives glued at
            // t = 0: erf(0) = 0 cancels the join term, so each erf picks up
            // its own side's width.
            let s_hi = if c1 > 0.0 { p.sigma_r } else { p.sigma_l };
            let s_lo = if c0 < 0.0 { p.sigma_l } else { p.sigma_r };
            acc += SQRT_PI_OVER_2
                * (s_hi * erf(c1 * FRAC_1_SQRT_2) - s_lo * erf(c0 * FRAC_1_SQRT_2));
        }
        let t_lo = tmin.max(p.alpha_r);
        if t_lo < tmax {
            acc += p.sigma_r * tail_integral(t_lo, tmax, p.alpha_r, p.n_r);
        }
        Ok(acc)
    }

    fn max_value(&self, params: &[f64], _support: Range) -> Result<f64> {
        self.prepare(params)?;
        Ok(1.0)
    }
}

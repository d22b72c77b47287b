use crate::math::{hyp2f1, log1pexp, sigmoid};
use crate::pdf::{Range, ShapePdf};
use sf_core::{Error, Result};

/// Below this slope magnitude the density reduces to the pure logistic and
/// the integral uses its closed log form; the hypergeometric antiderivative
/// divides by `b`.
const B_DEGENERATE_EPS: f64 = 1e-12;

/// Logistic turn-on multiplying a falling exponential:
///
/// `f(x) = exp(b·x) / (1 + exp(s·(m - x)))`
///
/// models a rising trigger/selection efficiency near a threshold under an
/// exponential background slope.
///
/// The analytic integral uses the Gauss hypergeometric antiderivative
/// `exp(b·x)/b·[1 - ₂F₁(1, b/s; (b+s)/s; -exp(s·(x-m)))]`; for points above
/// the midpoint the series argument leaves the unit disk and the evaluation
/// goes through the analytic continuation (see [`crate::math`]). With
/// `|b| < 1e-12` the closed logistic-log form is used instead.
///
/// **Shape parameters (3):** `[m, s, b]` with `m` the turn-on midpoint,
/// `s > 0` the steepness, `b` the exponential slope (may be ~0).
#[derive(Debug, Clone)]
pub struct ExponentialTurnOnPdf {
    observables: [String; 1],
}

impl ExponentialTurnOnPdf {
    /// Create an exponential turn-on PDF over the given observable.
    pub fn new(observable: impl Into<String>) -> Self {
        Self { observables: [observable.into()] }
    }

    fn prepare(&self, params: &[f64]) -> Result<(f64, f64, f64)> {
        if params.len() != 3 {
            return Err(Error::Validation(format!(
                "ExponentialTurnOnPdf expects 3 params (m, s, b), got {}",
                params.len()
            )));
        }
        let (m, s, b) = (params[0], params[1], params[2]);
        if !m.is_finite() || !s.is_finite() || !b.is_finite() {
            return Err(Error::Validation(format!(
                "ExponentialTurnOnPdf parameters must be finite, got m={m}, s={s}, b={b}"
            )));
        }
        if s <= 0.0 {
            return Err(Error::Validation(format!(
                "ExponentialTurnOnPdf: steepness must be > 0, got s={s}"
            )));
        }
        Ok((m, s, b))
    }

    /// Antiderivative of the density at `x` (general-slope branch).
    fn primitive(x: f64, m: f64, s: f64, b: f64) -> Result<f64> {
        let q = s * (x - m);
        let h = hyp2f1(1.0, b / s, (b + s) / s, -q.exp()).map_err(|e| {
            Error::Computation(format!(
                "ExponentialTurnOnPdf: antiderivative failed at x={x} (m={m}, s={s}, b={b}): {e}"
            ))
        })?;
        let f = (b * x).exp() / b * (1.0 - h);
        if f.is_finite() {
            Ok(f)
        } else {
            Err(Error::Computation(format!(
                "ExponentialTurnOnPdf: antiderivative is not finite at x={x} (m={m}, s={s}, b={b})"
            )))
        }
    }
}

impl ShapePdf for ExponentialTurnOnPdf {
    fn n_params(&self) -> usize {
        3
    }

    fn observables(&self) -> &[String] {
        &self.observables
    }

    fn density(&self, x: f64, params: &[f64]) -> Result<f64> {
        let (m, s, b) = self.prepare(params)?;
        // 1/(1+exp(s·(m-x))) = sigmoid(s·(x-m))
        Ok((b * x).exp() * sigmoid(s * (x - m)))
    }

    fn analytic_integral(&self, observable: &str, range: Range, params: &[f64]) -> Result<f64> {
        if !self.supports_analytic_integral(observable) {
            return Err(Error::NotImplemented(format!(
                "ExponentialTurnOnPdf has no analytic integral over '{observable}'"
            )));
        }
        range.validate("ExponentialTurnOnPdf")?;
        let (m, s, b) = self.prepare(params)?;

        if b.abs() < B_DEGENERATE_EPS {
            // Pure logistic: (1/s)·ln[(exp(s·hi)+exp(s·m)) / (exp(s·lo)+exp(s·m))],
            // computed as s·x + log(1+exp(s·(m-x))) per bound for stability.
            let upper = s * range.high + log1pexp(s * (m - range.high));
            let lower = s * range.low + log1pexp(s * (m - range.low));
            return Ok((upper - lower) / s);
        }

        let upper = Self::primitive(range.high, m, s, b)?;
        let lower = Self::primitive(range.low, m, s, b)?;
        Ok(upper - lower)
    }

    fn max_value(&self, params: &[f64], support: Range) -> Result<f64> {
        let (_, _, b) = self.prepare(params)?;
        support.validate("ExponentialTurnOnPdf")?;
        // The logistic factor is bounded by 1 and exp(b·x) is monotone, so the
        // exponential envelope at the favorable endpoint bounds the density.
        let edge = if b >= 0.0 { support.high } else { support.low };
        Ok((b * edge).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_density_is_logistic_times_exponential() {
        let pdf = ExponentialTurnOnPdf::new("m");
        let params = [5.0, 2.0, -0.3];
        let x = 6.2;
        let expected = (-0.3f64 * x).exp() / (1.0 + (2.0f64 * (5.0 - x)).exp());
        assert_relative_eq!(pdf.density(x, &params).unwrap(), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_degenerate_slope_matches_closed_log_form() {
        let pdf = ExponentialTurnOnPdf::new("m");
        let (m, s) = (0.0, 1.0);
        let integral = pdf
            .analytic_integral("m", Range::new(-10.0, 10.0), &[m, s, 0.0])
            .unwrap();
        let reference = ((10.0f64 * s).exp() + (m * s).exp()).ln() / s
            - ((-10.0f64 * s).exp() + (m * s).exp()).ln() / s;
        assert_relative_eq!(integral, reference, epsilon = 1e-12);
    }

    #[test]
    fn test_primitive_vanishes_far_below_turn_on() {
        // Far below the midpoint the antiderivative tends to zero, so the
        // integral over a far-left interval is ~0.
        let pdf = ExponentialTurnOnPdf::new("m");
        let integral = pdf
            .analytic_integral("m", Range::new(-60.0, -40.0), &[0.0, 2.0, -0.1])
            .unwrap();
        assert!(integral.abs() < 1e-12, "got {integral}");
    }

    #[test]
    fn test_rejects_non_positive_steepness() {
        let pdf = ExponentialTurnOnPdf::new("m");
        assert!(pdf.density(1.0, &[0.0, 0.0, -0.1]).is_err());
        assert!(pdf.density(1.0, &[0.0, -2.0, -0.1]).is_err());
    }

    #[test]
    fn test_max_value_bounds_density_on_support() {
        let pdf = ExponentialTurnOnPdf::new("m");
        let params = [2.0, 3.0, -0.4];
        let support = Range::new(-5.0, 15.0);
        let bound = pdf.max_value(&params, support).unwrap();
        let mut x = support.low;
        while x <= support.high {
            assert!(pdf.density(x, &params).unwrap() <= bound + 1e-12);
            x += 0.25;
        }
    }
}

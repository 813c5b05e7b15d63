//! Ordinary least-squares line fitting.
//!
//! `LinearFit::fit` regresses y on x and reports the same statistics as a
//! textbook simple linear regression: slope, intercept, Pearson r, the
//! two-sided p-value for a zero slope (Student t, n - 2 degrees of freedom)
//! and the standard errors of slope and intercept.

use statrs::distribution::{ContinuousCDF, StudentsT};

const TINY: f64 = 1.0e-20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
    pub intercept_stderr: f64,
    pub n: usize,
}

impl LinearFit {
    /// Returns `None` for fewer than two points, mismatched lengths, or a
    /// constant x (vertical line).
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 2 || n != y.len() {
            return None;
        }
        let nf = n as f64;
        let x_mean = x.iter().sum::<f64>() / nf;
        let y_mean = y.iter().sum::<f64>() / nf;

        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for (&xi, &yi) in x.iter().zip(y) {
            let dx = xi - x_mean;
            let dy = yi - y_mean;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        let r_value = if syy == 0.0 {
            0.0
        } else {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        };

        let (p_value, std_err, intercept_stderr) = if n == 2 {
            let p = if y[0] == y[1] { 1.0 } else { 0.0 };
            (p, 0.0, 0.0)
        } else {
            let df = (n - 2) as f64;
            let t = r_value * (df / ((1.0 - r_value) * (1.0 + r_value) + TINY)).sqrt();
            let p = student_t_two_sided(t, df)?;
            let se = ((1.0 - r_value * r_value) * syy / sxx / df).sqrt();
            let mean_square_x = sxx / nf + x_mean * x_mean;
            (p, se, se * mean_square_x.sqrt())
        };

        Some(LinearFit {
            slope,
            intercept,
            r_value,
            p_value,
            std_err,
            intercept_stderr,
            n,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Two-sided tail probability P(|T| >= |t|) for Student's t with `df`
/// degrees of freedom. `None` when `df` is not a valid parameter.
pub fn student_t_two_sided(t: f64, df: f64) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    if !t.is_finite() {
        return Some(0.0);
    }
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

//! Levenberg–Marquardt optimizer for small nonlinear least-squares problems.
//!
//! Generic over any [`CurveModel`] with `N` parameters. The damped normal
//! equations use Marquardt scaling (`JᵀJ` diagonal multiplied by `1 + λ`) and
//! are solved through [`solve_normal_equations`].

use serde::{Deserialize, Serialize};

use crate::math::solve_normal_equations;
use crate::models::CurveModel;

/// Configuration for Levenberg–Marquardt optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmConfig {
    /// Maximum number of Jacobian evaluations; `None` means `200 * (N + 1)`.
    pub max_iterations: Option<usize>,
    /// Relative reduction of the sum of squares below which we stop.
    pub ftol: f64,
    /// Relative parameter step below which we stop.
    pub xtol: f64,
    /// Largest gradient component (scaled) below which we stop.
    pub gtol: f64,
    pub initial_lambda: f64,
    /// Factor to increase lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on an accepted step.
    pub lambda_down: f64,
    /// Lambda above which the search is considered stalled.
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e16,
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmStatus {
    /// Sum of squares stopped decreasing (relative `ftol`).
    SumOfSquares,
    /// Parameter step became negligible (relative `xtol`).
    Step,
    /// Gradient vanished (`gtol`), including an exact fit.
    Gradient,
    /// Iteration cap reached.
    MaxIterations,
    /// Lambda exceeded `max_lambda` without an accepted step.
    Stalled,
    /// The damped normal equations could not be solved.
    Singular,
    /// The model produced a non-finite residual at the starting point.
    NonFinite,
}

impl LmStatus {
    pub fn converged(self) -> bool {
        matches!(
            self,
            LmStatus::SumOfSquares | LmStatus::Step | LmStatus::Gradient
        )
    }
}

/// Result of L-M optimization.
#[derive(Debug, Clone, Copy)]
pub struct LmReport<const N: usize> {
    pub params: [f64; N],
    /// Sum of squared residuals at `params`.
    pub chi2: f64,
    pub iterations: usize,
    pub status: LmStatus,
}

/// Minimize `Σ (y_i - f(x_i; p))²` starting from `initial`.
pub fn optimize<const N: usize, M: CurveModel<N>>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: [f64; N],
    config: &LmConfig,
) -> LmReport<N> {
    let max_iterations = config.max_iterations.unwrap_or(200 * (N + 1));

    let mut params = initial;
    let mut chi2 = sum_of_squares(model, x, y, &params);
    let mut lambda = config.initial_lambda;

    if !chi2.is_finite() {
        return LmReport {
            params,
            chi2,
            iterations: 0,
            status: LmStatus::NonFinite,
        };
    }

    // Pre-allocate buffers once, reuse across iterations
    let mut jacobian: Vec<[f64; N]> = Vec::with_capacity(x.len());
    let mut residuals: Vec<f64> = Vec::with_capacity(x.len());

    let mut iterations = 0;
    let mut needs_jacobian = true;
    let mut hessian = [[0.0; N]; N];
    let mut gradient = [0.0; N];

    let status = loop {
        if iterations >= max_iterations {
            break LmStatus::MaxIterations;
        }

        if needs_jacobian {
            iterations += 1;
            fill_jacobian_residuals(model, x, y, &params, &mut jacobian, &mut residuals);
            (hessian, gradient) = hessian_gradient(&jacobian, &residuals);
            needs_jacobian = false;

            if chi2 == 0.0 || scaled_gradient_norm(&hessian, &gradient, chi2) <= config.gtol {
                break LmStatus::Gradient;
            }
        }

        let mut damped = hessian;
        for (i, row) in damped.iter_mut().enumerate() {
            // Floor keeps a parameter with a vanishing column from making the system singular.
            row[i] = (row[i] * (1.0 + lambda)).max(row[i] + lambda * f64::EPSILON);
        }

        let Some(delta) = solve_normal_equations(&damped, &gradient) else {
            break LmStatus::Singular;
        };

        let step_small = delta
            .iter()
            .zip(params.iter())
            .all(|(d, p)| d.abs() <= config.xtol * (p.abs() + config.xtol));

        let mut trial = params;
        for (p, d) in trial.iter_mut().zip(delta.iter()) {
            *p += d;
        }
        let trial_chi2 = sum_of_squares(model, x, y, &trial);

        if trial_chi2.is_finite() && trial_chi2 < chi2 {
            let reduction = (chi2 - trial_chi2) / chi2;
            params = trial;
            chi2 = trial_chi2;
            lambda *= config.lambda_down;
            needs_jacobian = true;

            if step_small {
                break LmStatus::Step;
            }
            if reduction <= config.ftol {
                break LmStatus::SumOfSquares;
            }
        } else {
            if step_small {
                break LmStatus::Step;
            }
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                break LmStatus::Stalled;
            }
        }
    };

    LmReport {
        params,
        chi2,
        iterations,
        status,
    }
}

/// Sum of squared residuals; non-finite if the model is undefined anywhere.
pub fn sum_of_squares<const N: usize, M: CurveModel<N>>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64; N],
) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| {
            let r = yi - model.value(xi, params);
            r * r
        })
        .sum()
}

fn fill_jacobian_residuals<const N: usize, M: CurveModel<N>>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64; N],
    jacobian: &mut Vec<[f64; N]>,
    residuals: &mut Vec<f64>,
) {
    jacobian.clear();
    residuals.clear();

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        jacobian.push(model.gradient(xi, params));
        residuals.push(yi - model.value(xi, params));
    }
}

/// `JᵀJ` and `Jᵀr`, computing only the upper triangle and mirroring.
#[allow(clippy::needless_range_loop)]
fn hessian_gradient<const N: usize>(
    jacobian: &[[f64; N]],
    residuals: &[f64],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for (row, &r) in jacobian.iter().zip(residuals.iter()) {
        for i in 0..N {
            gradient[i] += row[i] * r;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

/// Largest cosine between the residual vector and a Jacobian column.
fn scaled_gradient_norm<const N: usize>(
    hessian: &[[f64; N]; N],
    gradient: &[f64; N],
    chi2: f64,
) -> f64 {
    let rnorm = chi2.sqrt();
    (0..N)
        .filter(|&k| hessian[k][k] > 0.0)
        .map(|k| (gradient[k] / (hessian[k][k].sqrt() * rnorm)).abs())
        .fold(0.0f64, f64::max)
}

//! Nonlinear least-squares curve fitting.
//!
//! Thin, validating wrapper around the Levenberg–Marquardt optimizer: checks
//! the inputs, runs the fit, turns the optimizer status into a `Result`, and
//! estimates the parameter covariance from the Jacobian at the optimum.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::math::levenberg::{self, LmConfig, LmStatus};
use crate::models::CurveModel;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveFitError {
    #[error("x has {x} samples but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("{points} samples cannot determine {params} parameters")]
    TooFewPoints { points: usize, params: usize },
    #[error("input data contains NaN or infinite values")]
    NonFiniteInput,
    #[error("model is not finite at the initial parameters")]
    NonFiniteStart,
    #[error("normal equations are singular")]
    Singular,
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// A successful fit.
#[derive(Debug, Clone, Copy)]
pub struct CurveFit<const N: usize> {
    pub params: [f64; N],
    /// Sum of squared residuals.
    pub chi2: f64,
    /// `(JᵀJ)⁻¹ · chi2 / (m - N)`; `None` when it cannot be estimated.
    pub covariance: Option<[[f64; N]; N]>,
    pub iterations: usize,
    pub status: LmStatus,
}

impl<const N: usize> CurveFit<N> {
    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub fn std_errors(&self) -> Option<[f64; N]> {
        let cov = self.covariance?;
        Some(std::array::from_fn(|i| cov[i][i].sqrt()))
    }
}

/// Fit `model` to `(x, y)` starting from `p0`.
pub fn curve_fit<const N: usize, M: CurveModel<N>>(
    model: &M,
    x: &[f64],
    y: &[f64],
    p0: [f64; N],
    config: &LmConfig,
) -> Result<CurveFit<N>, CurveFitError> {
    if x.len() != y.len() {
        return Err(CurveFitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < N {
        return Err(CurveFitError::TooFewPoints {
            points: x.len(),
            params: N,
        });
    }
    if x.iter().chain(y.iter()).chain(p0.iter()).any(|v| !v.is_finite()) {
        return Err(CurveFitError::NonFiniteInput);
    }

    let report = levenberg::optimize(model, x, y, p0, config);
    match report.status {
        // Stalled means no damped step improves chi2: a numerical minimum.
        s if s.converged() || s == LmStatus::Stalled => {}
        LmStatus::NonFinite => return Err(CurveFitError::NonFiniteStart),
        LmStatus::Singular => return Err(CurveFitError::Singular),
        _ => {
            return Err(CurveFitError::NotConverged {
                iterations: report.iterations,
            });
        }
    }
    if report.params.iter().any(|p| !p.is_finite()) {
        return Err(CurveFitError::NotConverged {
            iterations: report.iterations,
        });
    }

    Ok(CurveFit {
        params: report.params,
        chi2: report.chi2,
        covariance: covariance(model, x, &report.params, report.chi2),
        iterations: report.iterations,
        status: report.status,
    })
}

fn covariance<const N: usize, M: CurveModel<N>>(
    model: &M,
    x: &[f64],
    params: &[f64; N],
    chi2: f64,
) -> Option<[[f64; N]; N]> {
    if x.len() <= N {
        return None;
    }
    let mut jtj = DMatrix::<f64>::zeros(N, N);
    for &xi in x {
        let g = model.gradient(xi, params);
        for r in 0..N {
            for c in 0..N {
                jtj[(r, c)] += g[r] * g[c];
            }
        }
    }
    let inv = jtj.try_inverse()?;
    let scale = chi2 / (x.len() - N) as f64;
    let cov: [[f64; N]; N] = std::array::from_fn(|r| std::array::from_fn(|c| inv[(r, c)] * scale));
    cov.iter().flatten().all(|v| v.is_finite()).then_some(cov)
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    use super::*;
    use crate::models::{Biexponential, BiexponentialModel, PseudoVoigt, PseudoVoigtModel};

    #[test]
    fn fits_biexponential_baseline() {
        let truth = Biexponential {
            a: 4.0,
            b: 3.0,
            c: 2.0,
            d: 0.4,
            e: 0.5,
        };
        let x: Vec<f64> = (0..120).map(|i| i as f64 * 0.05).collect();
        let y = truth.curve(&x);
        let fit = curve_fit(
            &BiexponentialModel,
            &x,
            &y,
            [3.0, 2.0, 1.5, 0.3, 0.3],
            &LmConfig::default(),
        )
        .unwrap();
        assert!(fit.chi2 < 1e-8, "chi2={}", fit.chi2);
        let got = Biexponential::from_array(fit.params);
        assert!((got.e - truth.e).abs() < 1e-3);
    }

    #[test]
    fn noisy_peak_has_sensible_uncertainties() {
        let truth = PseudoVoigt {
            height: 20.0,
            center: 50.0,
            width_g: 4.0,
            width_l: 5.0,
            constant: 2.0,
        };
        let x: Vec<f64> = (0..101).map(|i| i as f64).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.1).unwrap();
        let y: Vec<f64> = truth
            .curve(&x)
            .into_iter()
            .map(|v| v + noise.sample(&mut rng))
            .collect();

        let fit = curve_fit(
            &PseudoVoigtModel,
            &x,
            &y,
            [15.0, 48.0, 3.0, 3.0, 1.0],
            &LmConfig::default(),
        )
        .unwrap();
        let got = PseudoVoigt::from_array(fit.params);
        let se = fit.std_errors().unwrap();
        assert!((got.center - 50.0).abs() < 0.2);
        assert!((got.height - 20.0).abs() < 1.0);
        assert!(se.iter().all(|s| s.is_finite() && *s > 0.0));
    }

    #[test]
    fn rejects_bad_input() {
        let model = PseudoVoigtModel;
        let cfg = LmConfig::default();
        let p0 = [1.0, 0.0, 1.0, 1.0, 0.0];

        let err = curve_fit(&model, &[1.0, 2.0], &[1.0], p0, &cfg).unwrap_err();
        assert_eq!(err, CurveFitError::LengthMismatch { x: 2, y: 1 });

        let err = curve_fit(&model, &[1.0, 2.0], &[1.0, 2.0], p0, &cfg).unwrap_err();
        assert_eq!(
            err,
            CurveFitError::TooFewPoints {
                points: 2,
                params: 5
            }
        );

        let x = [0.0, 1.0, 2.0, 3.0, f64::NAN];
        let err = curve_fit(&model, &x, &[0.0; 5], p0, &cfg).unwrap_err();
        assert_eq!(err, CurveFitError::NonFiniteInput);
    }

    #[test]
    fn zero_width_start_is_reported() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![1.0; 10];
        let err = curve_fit(
            &PseudoVoigtModel,
            &x,
            &y,
            [1.0, 0.0, 0.0, 0.0, 0.0],
            &LmConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, CurveFitError::NonFiniteStart);
    }

    #[test]
    fn iteration_cap_is_not_converged() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y = Biexponential {
            a: 8.0,
            b: 0.08,
            c: 3.0,
            d: 0.01,
            e: 0.5,
        }
        .curve(&x);
        let cfg = LmConfig {
            max_iterations: Some(1),
            ..LmConfig::default()
        };
        let err = curve_fit(&BiexponentialModel, &x, &y, [1.0, 1.0, 1.0, 1.0, 1.0], &cfg).unwrap_err();
        assert_eq!(err, CurveFitError::NotConverged { iterations: 1 });
    }
}

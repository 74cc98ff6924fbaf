//! Fittable curve models.
//!
//! The least-squares fitter relies on two primitive operations:
//! - evaluate `y(x)` for a parameter vector (for residuals)
//! - fill the gradient of `y(x)` with respect to the parameters (for the Jacobian)
//!
//! These are implemented here for each lineshape that is fitted somewhere.

use super::lineshape::{biexponential, gaussian, lorentzian, pseudo_voigt};

/// A model `y = f(x; p)` with `N` parameters and an analytic gradient.
pub trait CurveModel<const N: usize> {
    fn value(&self, x: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives `∂f/∂p_k` at `x`.
    fn gradient(&self, x: f64, params: &[f64; N]) -> [f64; N];
}

/// Pseudo-Voigt + constant, parameters `[height, center, width_g, width_l, constant]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PseudoVoigtModel;

impl CurveModel<5> for PseudoVoigtModel {
    fn value(&self, x: f64, p: &[f64; 5]) -> f64 {
        pseudo_voigt(x, p[0], p[1], p[2], p[3], p[4])
    }

    fn gradient(&self, x: f64, p: &[f64; 5]) -> [f64; 5] {
        let [height, center, width_g, width_l, _] = *p;
        let d = x - center;
        let d2 = d * d;

        let g = gaussian(x, center, width_g);
        let l = lorentzian(x, center, width_l);

        // G = exp(-d^2 / (4 wg^2))
        let wg2 = width_g * width_g;
        let dg_dc = g * d / (2.0 * wg2);
        let dg_dwg = g * d2 / (2.0 * wg2 * width_g);

        // L = a^2 / (d^2 + a^2), a = wl / 2
        let a = width_l / 2.0;
        let denom = d2 + a * a;
        let denom2 = denom * denom;
        let dl_dc = 2.0 * a * a * d / denom2;
        let dl_dwl = a * d2 / denom2;

        [
            0.5 * g + 0.5 * l,
            height * (0.5 * dg_dc + 0.5 * dl_dc),
            0.5 * height * dg_dwg,
            0.5 * height * dl_dwl,
            1.0,
        ]
    }
}

/// Biexponential decay, parameters `[a, b, c, d, e]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiexponentialModel;

impl CurveModel<5> for BiexponentialModel {
    fn value(&self, x: f64, p: &[f64; 5]) -> f64 {
        biexponential(x, p[0], p[1], p[2], p[3], p[4])
    }

    fn gradient(&self, x: f64, p: &[f64; 5]) -> [f64; 5] {
        let eb = (-p[1] * x).exp();
        let ed = (-p[3] * x).exp();
        [eb, -p[0] * x * eb, ed, -p[2] * x * ed, 1.0]
    }
}

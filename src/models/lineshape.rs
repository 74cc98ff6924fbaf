//! Peak-shape functions used as fitting models.
//!
//! All shapes are normalized to a maximal height of 1 (not an area of 1), so
//! the pseudo-Voigt evaluated at its own center is exactly `height + constant`.
//!
//! A width of 0 produces NaN/inf; callers must avoid it.

use serde::{Deserialize, Serialize};

/// Gaussian with peak height 1: `exp(-(x - center)^2 / (2 * width)^2)`.
pub fn gaussian(x: f64, center: f64, width: f64) -> f64 {
    let d = x - center;
    let denom = 2.0 * width;
    (-(d * d) / (denom * denom)).exp()
}

/// Lorentzian with peak height 1: `(width/2)^2 / ((x - center)^2 + (width/2)^2)`.
pub fn lorentzian(x: f64, center: f64, width: f64) -> f64 {
    let d = x - center;
    let hw2 = (width / 2.0) * (width / 2.0);
    hw2 / (d * d + hw2)
}

/// Equal-weight pseudo-Voigt plus a constant offset.
pub fn pseudo_voigt(
    x: f64,
    height: f64,
    center: f64,
    width_g: f64,
    width_l: f64,
    constant: f64,
) -> f64 {
    height * (0.5 * gaussian(x, center, width_g) + 0.5 * lorentzian(x, center, width_l))
        + constant
}

/// `a*exp(-b*x) + c*exp(-d*x) + e`.
pub fn biexponential(x: f64, a: f64, b: f64, c: f64, d: f64, e: f64) -> f64 {
    a * (-b * x).exp() + c * (-d * x).exp() + e
}

/// Pseudo-Voigt parameters, in the order used by the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PseudoVoigt {
    pub height: f64,
    pub center: f64,
    pub width_g: f64,
    pub width_l: f64,
    pub constant: f64,
}

impl PseudoVoigt {
    pub fn eval(&self, x: f64) -> f64 {
        pseudo_voigt(
            x,
            self.height,
            self.center,
            self.width_g,
            self.width_l,
            self.constant,
        )
    }

    pub fn curve(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.eval(v)).collect()
    }

    pub fn to_array(&self) -> [f64; 5] {
        [
            self.height,
            self.center,
            self.width_g,
            self.width_l,
            self.constant,
        ]
    }

    pub fn from_array(p: [f64; 5]) -> Self {
        Self {
            height: p[0],
            center: p[1],
            width_g: p[2],
            width_l: p[3],
            constant: p[4],
        }
    }
}

/// Biexponential decay parameters `(a, b, c, d, e)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Biexponential {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl Biexponential {
    pub fn eval(&self, x: f64) -> f64 {
        biexponential(x, self.a, self.b, self.c, self.d, self.e)
    }

    pub fn curve(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.eval(v)).collect()
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.a, self.b, self.c, self.d, self.e]
    }

    pub fn from_array(p: [f64; 5]) -> Self {
        Self {
            a: p[0],
            b: p[1],
            c: p[2],
            d: p[3],
            e: p[4],
        }
    }
}

//! Derivative-free Nelder–Mead (downhill simplex) minimizer.
//!
//! Coefficients, initial simplex and stopping rule follow the classic
//! formulation used by most numerical libraries:
//!
//! - reflection ρ = 1, expansion χ = 2, contraction ψ = 0.5, shrink σ = 0.5
//! - the initial simplex perturbs each non-zero coordinate by 5% and each
//!   zero coordinate by 0.00025
//! - convergence when both the simplex extent (`xatol`) and the spread of
//!   objective values (`fatol`) fall below their tolerances
//!
//! The objective is fallible: an `Err` from any evaluation aborts the search
//! and is returned unchanged.

use serde::{Deserialize, Serialize};

const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

const NONZERO_STEP: f64 = 0.05;
const ZERO_STEP: f64 = 0.00025;

/// Stopping criteria for the simplex search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimplexConfig {
    /// Absolute tolerance on the simplex extent.
    pub xatol: f64,
    /// Absolute tolerance on the spread of objective values.
    pub fatol: f64,
    /// Iteration cap; `None` means `200 * n`.
    pub max_iterations: Option<usize>,
    /// Evaluation cap; `None` means `200 * n`.
    pub max_evaluations: Option<usize>,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            xatol: 1e-4,
            fatol: 1e-4,
            max_iterations: None,
            max_evaluations: None,
        }
    }
}

/// Outcome of a simplex search.
#[derive(Debug, Clone)]
pub struct SimplexReport {
    /// Best vertex found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// `false` when an iteration or evaluation cap stopped the search.
    pub converged: bool,
}

struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F> Counted<F> {
    fn call<E>(&mut self, x: &[f64]) -> Result<f64, E>
    where
        F: FnMut(&[f64]) -> Result<f64, E>,
    {
        self.evaluations += 1;
        (self.f)(x)
    }
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F, E>(f: F, x0: &[f64], config: &SimplexConfig) -> Result<SimplexReport, E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    let n = x0.len();
    let max_iterations = config.max_iterations.unwrap_or(200 * n.max(1));
    let max_evaluations = config.max_evaluations.unwrap_or(200 * n.max(1));

    let mut objective = Counted { f, evaluations: 0 };
    if n == 0 {
        let fun = objective.call(x0)?;
        return Ok(SimplexReport {
            x: Vec::new(),
            fun,
            iterations: 0,
            evaluations: 1,
            converged: true,
        });
    }

    let mut sim: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    sim.push(x0.to_vec());
    for k in 0..n {
        let mut y = x0.to_vec();
        if y[k] != 0.0 {
            y[k] *= 1.0 + NONZERO_STEP;
        } else {
            y[k] = ZERO_STEP;
        }
        sim.push(y);
    }

    let mut fsim = Vec::with_capacity(n + 1);
    for vertex in &sim {
        fsim.push(objective.call(vertex)?);
    }
    sort_simplex(&mut sim, &mut fsim);

    let mut iterations = 0;
    let mut converged = false;

    while objective.evaluations < max_evaluations && iterations < max_iterations {
        if within_tolerance(&sim, &fsim, config) {
            converged = true;
            break;
        }

        let worst = n;
        let xbar = centroid(&sim[..worst]);

        let xr = affine(&xbar, &sim[worst], 1.0 + RHO, -RHO);
        let fxr = objective.call(&xr)?;
        let mut shrink = false;

        if fxr < fsim[0] {
            let xe = affine(&xbar, &sim[worst], 1.0 + RHO * CHI, -RHO * CHI);
            let fxe = objective.call(&xe)?;
            if fxe < fxr {
                sim[worst] = xe;
                fsim[worst] = fxe;
            } else {
                sim[worst] = xr;
                fsim[worst] = fxr;
            }
        } else if fxr < fsim[worst - 1] {
            sim[worst] = xr;
            fsim[worst] = fxr;
        } else if fxr < fsim[worst] {
            // Outside contraction.
            let xc = affine(&xbar, &sim[worst], 1.0 + PSI * RHO, -PSI * RHO);
            let fxc = objective.call(&xc)?;
            if fxc <= fxr {
                sim[worst] = xc;
                fsim[worst] = fxc;
            } else {
                shrink = true;
            }
        } else {
            // Inside contraction.
            let xcc = affine(&xbar, &sim[worst], 1.0 - PSI, PSI);
            let fxcc = objective.call(&xcc)?;
            if fxcc < fsim[worst] {
                sim[worst] = xcc;
                fsim[worst] = fxcc;
            } else {
                shrink = true;
            }
        }

        if shrink {
            for j in 1..=n {
                let shrunk: Vec<f64> = sim[0]
                    .iter()
                    .zip(&sim[j])
                    .map(|(&best, &v)| best + SIGMA * (v - best))
                    .collect();
                fsim[j] = objective.call(&shrunk)?;
                sim[j] = shrunk;
            }
        }

        sort_simplex(&mut sim, &mut fsim);
        iterations += 1;
    }

    // A search that used its last evaluation on the converging step still counts.
    if !converged && within_tolerance(&sim, &fsim, config) {
        converged = true;
    }

    Ok(SimplexReport {
        x: sim.swap_remove(0),
        fun: fsim[0],
        iterations,
        evaluations: objective.evaluations,
        converged,
    })
}

fn within_tolerance(sim: &[Vec<f64>], fsim: &[f64], config: &SimplexConfig) -> bool {
    let best = &sim[0];
    let x_spread = sim[1..]
        .iter()
        .flat_map(|v| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
        .fold(0.0f64, f64::max);
    let f_spread = fsim[1..]
        .iter()
        .map(|f| (f - fsim[0]).abs())
        .fold(0.0f64, f64::max);
    x_spread <= config.xatol && f_spread <= config.fatol
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let n = vertices[0].len();
    let mut out = vec![0.0; n];
    for v in vertices {
        for (o, x) in out.iter_mut().zip(v) {
            *o += x;
        }
    }
    let m = vertices.len() as f64;
    out.iter_mut().for_each(|o| *o /= m);
    out
}

/// `a * xbar + b * worst`, component-wise.
fn affine(xbar: &[f64], worst: &[f64], a: f64, b: f64) -> Vec<f64> {
    xbar.iter().zip(worst).map(|(&c, &w)| a * c + b * w).collect()
}

fn sort_simplex(sim: &mut Vec<Vec<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    *sim = order.iter().map(|&i| sim[i].clone()).collect();
    *fsim = order.iter().map(|&i| fsim[i]).collect();
}

//! Small dense linear solves for the Levenberg–Marquardt normal equations.
//!
//! The damped normal matrix `JᵀJ + λ·diag(JᵀJ)` is tiny (one row per model
//! parameter) but can become nearly singular when a lineshape width collapses
//! or two parameters are strongly correlated. We therefore solve through SVD
//! and progressively relax the singular-value cutoff instead of using a plain
//! Cholesky factorization.
//!
//! Cutoffs are relative to the largest singular value, and the normal matrix
//! is equilibrated to a unit diagonal first, so the solution does not depend
//! on the units of the data or of the parameters.

use nalgebra::{DMatrix, DVector};

/// Solve `a · x = b` in the least-squares sense using SVD.
///
/// Singular values below `tol · σ_max` are treated as zero.
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return None;
    }

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol * sigma_max) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Solve the square system given as fixed-size arrays.
///
/// The system is solved as `(D·A·D) y = D·b`, `x = D·y`, with
/// `D = diag(A)^(-1/2)`; rows with a non-positive diagonal are left unscaled.
pub fn solve_normal_equations<const N: usize>(
    matrix: &[[f64; N]; N],
    rhs: &[f64; N],
) -> Option<[f64; N]> {
    let d: [f64; N] = std::array::from_fn(|i| {
        let diag = matrix[i][i];
        if diag > 0.0 && diag.is_finite() { 1.0 / diag.sqrt() } else { 1.0 }
    });
    let a = DMatrix::from_fn(N, N, |i, j| d[i] * matrix[i][j] * d[j]);
    let b = DVector::from_fn(N, |i, _| d[i] * rhs[i]);
    let y = solve_least_squares(&a, &b)?;

    let mut out = [0.0; N];
    for (i, (o, v)) in out.iter_mut().zip(y.iter()).enumerate() {
        *o = d[i] * v;
    }
    Some(out)
}

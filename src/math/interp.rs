//! One-dimensional piecewise-linear interpolation.
//!
//! Semantics match the usual `interp(x, xp, fp)` contract: `xp` must be
//! non-decreasing, values left of `xp[0]` take `fp[0]`, values right of the
//! last knot take the last value (flat extrapolation).

/// Interpolate `fp(xp)` at a single `x`.
///
/// Returns NaN for an empty table or a NaN query.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }

    // xp[j] <= x < xp[j + 1]
    let j = xp[..n].partition_point(|&v| v <= x) - 1;
    linear_interp((xp[j], fp[j]), (xp[j + 1], fp[j + 1]), x)
}

/// Interpolate at every point of `x`.
pub fn interp_all(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x.iter().map(|&v| interp(v, xp, fp)).collect()
}

pub fn linear_interp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < 1e-12 {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

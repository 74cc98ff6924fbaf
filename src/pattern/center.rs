//! Diffraction-center refinement.
//!
//! The refiner looks for the circle that sits on the brightest annular feature
//! in the lower part of the frame. For a trial `(x, y, r)` it samples every
//! pixel within a thin band around the circle (`|d² - r²| < tolerance`) whose
//! row index exceeds `row_cutoff`, and scores the trial with the reciprocal of
//! their mean intensity. Minimizing that reciprocal with Nelder–Mead maximizes
//! the mean intensity along the contour.
//!
//! Two scale factors are applied: the guess is divided by `scale_factor`
//! before the search, the cost multiplies trial coordinates by
//! `cost_scale_factor`, and the answer is multiplied by `scale_factor` again.
//! With the default (equal) factors the mappings cancel.
//!
//! Only the position is refined; the returned radius is the guess radius.

use thiserror::Error;
use tracing::debug;

use crate::domain::{CenterGuess, Image, RefinedCenter, RefinerConfig};
use crate::error::{IrisError, Result};
use crate::math::simplex;
use crate::pattern::Mask;

/// Why a trial circle could not be scored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContourError {
    #[error("no unmasked pixel on the contour (x={x:.3}, y={y:.3}, r={radius:.3})")]
    Empty { x: f64, y: f64, radius: f64 },
    #[error("trial contour has non-finite coordinates")]
    NonFinite,
}

/// Refines the center of a diffraction pattern from a coarse guess.
#[derive(Debug, Clone, Default)]
pub struct CenterRefiner {
    config: RefinerConfig,
}

impl CenterRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Refine `guess` on `image`, skipping pixels invalidated by `mask`.
    pub fn refine(
        &self,
        image: &Image,
        guess: CenterGuess,
        mask: Option<&Mask>,
    ) -> Result<RefinedCenter> {
        let optimization_error = |reason: String| IrisError::Optimization {
            x: guess.x,
            y: guess.y,
            radius: guess.radius,
            reason,
        };

        if image.is_empty() {
            return Err(IrisError::DegenerateInput(
                "cannot refine a center on an empty image".to_string(),
            ));
        }
        if let Some(mask) = mask {
            if mask.shape() != image.shape() {
                return Err(IrisError::DegenerateInput(format!(
                    "mask shape {:?} does not match image shape {:?}",
                    mask.shape(),
                    image.shape()
                )));
            }
        }
        let sf = self.config.scale_factor;
        if !(sf.is_finite() && sf != 0.0 && self.config.cost_scale_factor.is_finite()) {
            return Err(IrisError::InvalidArgument(format!(
                "scale factors must be finite and non-zero (scale_factor={sf}, cost_scale_factor={})",
                self.config.cost_scale_factor
            )));
        }
        if !(guess.x.is_finite() && guess.y.is_finite() && guess.radius.is_finite()) {
            return Err(optimization_error("guess is not finite".to_string()));
        }

        let start = [guess.x / sf, guess.y / sf, guess.radius / sf];
        let report = simplex::minimize(
            |p: &[f64]| self.contour_cost(image, mask, p[0], p[1], p[2]),
            &start,
            &self.config.simplex,
        )
        .map_err(|e| optimization_error(e.to_string()))?;

        if !report.converged {
            return Err(optimization_error(format!(
                "simplex did not converge after {} iterations ({} evaluations)",
                report.iterations, report.evaluations
            )));
        }

        let refined = RefinedCenter {
            x: report.x[0] * sf,
            y: report.x[1] * sf,
            radius: guess.radius,
            contour_mean: 1.0 / report.fun,
            iterations: report.iterations,
            evaluations: report.evaluations,
        };
        debug!(
            guess_x = guess.x,
            guess_y = guess.y,
            x = refined.x,
            y = refined.y,
            iterations = refined.iterations,
            "refined diffraction center"
        );
        Ok(refined)
    }

    /// Reciprocal mean intensity on the contour for optimizer-space `(x, y, r)`.
    pub fn contour_cost(
        &self,
        image: &Image,
        mask: Option<&Mask>,
        x: f64,
        y: f64,
        r: f64,
    ) -> std::result::Result<f64, ContourError> {
        let s = self.config.cost_scale_factor;
        let (xc, yc, radius) = (x * s, y * s, r * s);
        let (sum, count) = self.contour_sum(image, mask, xc, yc, radius)?;
        if count == 0 {
            return Err(ContourError::Empty { x: xc, y: yc, radius });
        }
        Ok(1.0 / (sum / count as f64))
    }

    /// Sum and count of the sampled contour pixels in image coordinates.
    fn contour_sum(
        &self,
        image: &Image,
        mask: Option<&Mask>,
        xc: f64,
        yc: f64,
        radius: f64,
    ) -> std::result::Result<(f64, usize), ContourError> {
        if !(xc.is_finite() && yc.is_finite() && radius.is_finite()) {
            return Err(ContourError::NonFinite);
        }
        let (rows, cols) = image.shape();
        let tol = self.config.contour_tolerance;
        let r2 = radius * radius;
        let outer = r2 + tol;

        let mut sum = 0.0;
        let mut count = 0usize;
        if rows == 0 || cols == 0 || outer <= 0.0 {
            return Ok((sum, count));
        }

        // Rows that can reach the band at all; the band test below is exact.
        let reach = outer.sqrt();
        let first_row = self
            .config
            .row_cutoff
            .saturating_add(1)
            .max((yc - reach).floor().max(0.0) as usize);
        let last_row = (yc + reach).ceil().min((rows - 1) as f64);
        if last_row < 0.0 {
            return Ok((sum, count));
        }

        for i in first_row..=last_row as usize {
            let dy = i as f64 - yc;
            let dy2 = dy * dy;
            if outer - dy2 <= 0.0 {
                continue;
            }
            let dx_out = (outer - dy2).sqrt();
            let inner = r2 - tol - dy2;
            let dx_in = if inner > 0.0 { inner.sqrt() } else { 0.0 };

            let left = column_span(xc - dx_out, xc - dx_in, cols);
            let right = column_span(xc + dx_in, xc + dx_out, cols);
            let spans = match (left, right) {
                (Some(l), Some(r)) if l.1 + 1 >= r.0 => [Some((l.0, r.1.max(l.1))), None],
                (l, r) => [l, r],
            };

            for (j0, j1) in spans.into_iter().flatten() {
                for j in j0..=j1 {
                    let dx = j as f64 - xc;
                    if (dx * dx + dy2 - r2).abs() >= tol {
                        continue;
                    }
                    if mask.is_some_and(|m| m.is_masked(i, j)) {
                        continue;
                    }
                    sum += image[(i, j)];
                    count += 1;
                }
            }
        }

        Ok((sum, count))
    }
}

/// Integer columns covering `[lo, hi]`, clamped to the image; `None` if empty.
fn column_span(lo: f64, hi: f64, cols: usize) -> Option<(usize, usize)> {
    let lo = lo.floor().max(0.0);
    let hi = hi.ceil().min((cols - 1) as f64);
    if hi < lo {
        return None;
    }
    Some((lo as usize, hi as usize))
}

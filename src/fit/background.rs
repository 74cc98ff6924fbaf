//! Inelastic background estimation.
//!
//! Each user-marked feature selects a window of `2 * chunk_size + 1` samples
//! around the nearest point of the curve. A pseudo-Voigt plus constant is
//! fitted to every window; the constants, spread over their window's x-values,
//! form a staircase that is linearly interpolated over the whole curve (flat
//! beyond the outermost windows).

use tracing::debug;

use crate::domain::{BackgroundConfig, BackgroundCurve, FeaturePoint, FittedChunk, PeakCenterSeed};
use crate::error::{IrisError, Result};
use crate::fit::curve::curve_fit;
use crate::math::interp_all;
use crate::models::{PseudoVoigt, PseudoVoigtModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundSubtractor {
    config: BackgroundConfig,
}

impl BackgroundSubtractor {
    pub fn new(config: BackgroundConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    /// Estimate the background of `(xdata, ydata)` from the marked `points`.
    pub fn estimate(
        &self,
        xdata: &[f64],
        ydata: &[f64],
        points: &[FeaturePoint],
    ) -> Result<BackgroundCurve> {
        if xdata.is_empty() {
            return Err(IrisError::DegenerateInput("curve has no samples".to_string()));
        }
        if xdata.len() != ydata.len() {
            return Err(IrisError::DegenerateInput(format!(
                "x has {} samples but y has {}",
                xdata.len(),
                ydata.len()
            )));
        }
        if points.is_empty() {
            return Err(IrisError::DegenerateInput(
                "background estimation needs at least one feature point".to_string(),
            ));
        }

        let chunks = points
            .iter()
            .enumerate()
            .map(|(index, point)| self.fit_chunk(xdata, ydata, index, point.x))
            .collect::<Result<Vec<_>>>()?;

        let background = interpolate_constants(xdata, &chunks);
        Ok(BackgroundCurve {
            x: xdata.to_vec(),
            background,
            chunks,
        })
    }

    fn fit_chunk(&self, xdata: &[f64], ydata: &[f64], index: usize, x: f64) -> Result<FittedChunk> {
        if !x.is_finite() {
            return Err(IrisError::DegenerateInput(format!(
                "feature {index} has a non-finite position"
            )));
        }
        let (lo, hi) = self.window(xdata.len(), nearest_index(xdata, x), index, x)?;
        let wx = &xdata[lo..=hi];
        let wy = &ydata[lo..=hi];

        let p0 = self.initial_guess(wx, wy, x);
        let fit = curve_fit(&PseudoVoigtModel, wx, wy, p0.to_array(), &self.config.lm)
            .map_err(|source| IrisError::FitConvergence { index, x, source })?;
        let params = PseudoVoigt::from_array(fit.params);

        debug!(
            feature = index,
            x,
            window_start = lo,
            window_end = hi,
            constant = params.constant,
            iterations = fit.iterations,
            "fitted background chunk"
        );

        Ok(FittedChunk {
            feature_index: index,
            feature_x: x,
            x: wx.to_vec(),
            y: wy.to_vec(),
            params,
        })
    }

    /// Inclusive sample range of the window centered on `center`.
    fn window(&self, len: usize, center: usize, index: usize, x: f64) -> Result<(usize, usize)> {
        let half = self.config.chunk_size as i64;
        let start = center as i64 - half;
        let end = center as i64 + half;
        if start < 0 || end >= len as i64 {
            return Err(IrisError::Bounds {
                index,
                x,
                start,
                end,
                len,
            });
        }
        Ok((start as usize, end as usize))
    }

    fn initial_guess(&self, wx: &[f64], wy: &[f64], feature_x: f64) -> PseudoVoigt {
        let (y_min, y_max) = min_max(wy);
        let (x_min, x_max) = min_max(wx);
        let center = match self.config.center_seed {
            PeakCenterSeed::WindowHalfSpan => (x_max - x_min) / 2.0,
            PeakCenterSeed::FeatureX => feature_x,
        };
        PseudoVoigt {
            height: y_max - y_min,
            center,
            width_g: 1.0,
            width_l: 1.0,
            constant: y_min,
        }
    }
}

/// Linear interpolation of the chunk constants over `xdata`.
///
/// Every x-value of every chunk carries that chunk's constant. Pairs are
/// ordered by x before interpolating, so features may be given in any order.
pub fn interpolate_constants(xdata: &[f64], chunks: &[FittedChunk]) -> Vec<f64> {
    let mut pairs: Vec<(f64, f64)> = chunks
        .iter()
        .flat_map(|c| c.x.iter().map(move |&x| (x, c.params.constant)))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (xp, fp): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    interp_all(xdata, &xp, &fp)
}

/// First index minimizing `|xdata[i] - x|`.
fn nearest_index(xdata: &[f64], x: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, &xi) in xdata.iter().enumerate() {
        let d = (xi - x).abs();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn min_max(v: &[f64]) -> (f64, f64) {
    v.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::data::synthetic::{diffraction_curve, noisy_peak};
    use crate::fit::CurveFitError;
    use crate::models::Biexponential;

    const TRUTH: PseudoVoigt = PseudoVoigt {
        height: 50.0,
        center: 20.0,
        width_g: 3.0,
        width_l: 4.0,
        constant: 10.0,
    };

    fn axis() -> Vec<f64> {
        (0..=100).map(|i| i as f64).collect()
    }

    fn chunk(xs: &[f64], constant: f64) -> FittedChunk {
        FittedChunk {
            feature_index: 0,
            feature_x: xs[0],
            x: xs.to_vec(),
            y: vec![0.0; xs.len()],
            params: PseudoVoigt {
                constant,
                ..TRUTH
            },
        }
    }

    #[test]
    fn recovers_constant_from_clean_peak() {
        let x = axis();
        let y = TRUTH.curve(&x);
        let curve = BackgroundSubtractor::default()
            .estimate(&x, &y, &[FeaturePoint::new(20.0, 0.0)])
            .unwrap();

        let fitted = curve.chunks[0].params.constant;
        assert!((fitted - 10.0).abs() < 1e-4, "constant={fitted}");
        assert_eq!(curve.chunks[0].x.len(), 41);
        assert_eq!(curve.background.len(), x.len());
        assert!(curve.background.iter().all(|&b| b == fitted));
    }

    #[test]
    fn recovers_constant_from_noisy_peak() {
        let x = axis();
        let mut rng = StdRng::seed_from_u64(2024);
        let y = noisy_peak(&TRUTH, &x, 0.05, &mut rng).unwrap();
        let curve = BackgroundSubtractor::default()
            .estimate(&x, &y, &[FeaturePoint::new(20.3, 7.0)])
            .unwrap();
        let fitted = curve.chunks[0].params.constant;
        assert!((fitted - 10.0).abs() < 0.3, "constant={fitted}");
    }

    #[test]
    fn feature_seed_fits_a_peak_away_from_the_window_half_span() {
        let truth = PseudoVoigt {
            center: 60.0,
            ..TRUTH
        };
        let x = axis();
        let y = truth.curve(&x);
        let config = BackgroundConfig {
            center_seed: PeakCenterSeed::FeatureX,
            ..BackgroundConfig::default()
        };
        let curve = BackgroundSubtractor::new(config)
            .estimate(&x, &y, &[FeaturePoint::new(60.0, 0.0)])
            .unwrap();
        let chunk = &curve.chunks[0];
        assert_eq!(chunk.x.first(), Some(&40.0));
        assert!((chunk.params.constant - 10.0).abs() < 1e-4);
        assert!((chunk.params.center - 60.0).abs() < 1e-4);
    }

    #[test]
    fn fit_does_not_depend_on_intensity_units() {
        let x = axis();
        let config = BackgroundConfig {
            center_seed: PeakCenterSeed::FeatureX,
            ..BackgroundConfig::default()
        };
        let fit_at = |scale: f64| {
            let truth = PseudoVoigt {
                height: 50.0 * scale,
                center: 60.0,
                constant: 10.0 * scale,
                ..TRUTH
            };
            let curve = BackgroundSubtractor::new(config)
                .estimate(&x, &truth.curve(&x), &[FeaturePoint::new(60.0, 0.0)])
                .unwrap();
            curve.chunks[0].params
        };

        let unit = fit_at(1.0);
        let tiny = fit_at(1e-7);
        assert!((unit.constant - 10.0).abs() < 1e-3, "constant={}", unit.constant);
        assert!((tiny.constant / 1e-7 - unit.constant).abs() < 1e-4, "constant={}", tiny.constant);
        assert!((tiny.height / 1e-7 - unit.height).abs() < 1e-4);
        assert!((tiny.center - unit.center).abs() < 1e-4);
        assert!((tiny.width_g.abs() - unit.width_g.abs()).abs() < 1e-4, "width_g={}", tiny.width_g);
        assert!((tiny.width_l.abs() - unit.width_l.abs()).abs() < 1e-4, "width_l={}", tiny.width_l);
    }

    #[test]
    fn background_follows_a_decaying_baseline() {
        let baseline = Biexponential {
            a: 20.0,
            b: 0.01,
            c: 5.0,
            d: 0.001,
            e: 2.0,
        };
        let peaks = [
            PseudoVoigt {
                center: 100.0,
                constant: 0.0,
                ..TRUTH
            },
            PseudoVoigt {
                center: 200.0,
                constant: 0.0,
                ..TRUTH
            },
        ];
        let x: Vec<f64> = (0..=300).map(|i| i as f64).collect();
        let y = diffraction_curve(&x, &baseline, &peaks);
        let config = BackgroundConfig {
            center_seed: PeakCenterSeed::FeatureX,
            ..BackgroundConfig::default()
        };
        let curve = BackgroundSubtractor::new(config)
            .estimate(&x, &y, &[FeaturePoint::new(100.0, 0.0), FeaturePoint::new(200.0, 0.0)])
            .unwrap();

        for &i in &[100, 200] {
            let expected = baseline.eval(x[i]);
            assert!((curve.background[i] - expected).abs() < 1.0, "bg[{i}]={}", curve.background[i]);
        }
        assert!(curve.background[100] > curve.background[150]);
        assert!(curve.background[150] > curve.background[200]);
    }

    #[test]
    fn two_constants_ramp_between_windows() {
        let x = axis();
        let left: Vec<f64> = (10..=20).map(|i| i as f64).collect();
        let right: Vec<f64> = (60..=70).map(|i| i as f64).collect();
        // Given out of order on purpose.
        let bg = interpolate_constants(&x, &[chunk(&right, 4.0), chunk(&left, 2.0)]);

        for i in 0..=20 {
            assert_eq!(bg[i], 2.0);
        }
        for i in 60..=100 {
            assert_eq!(bg[i], 4.0);
        }
        for i in 21..60 {
            let expected = 2.0 + 2.0 * (i as f64 - 20.0) / 40.0;
            assert!((bg[i] - expected).abs() < 1e-12);
            assert!(bg[i] > 2.0 && bg[i] < 4.0);
        }
    }

    #[test]
    fn nearest_index_prefers_the_first_tie() {
        let x = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&x, 1.5), 1);
        assert_eq!(nearest_index(&x, -7.0), 0);
        assert_eq!(nearest_index(&x, 9.0), 3);
    }

    #[test]
    fn window_past_the_edge_is_a_bounds_error() {
        let x = axis();
        let y = TRUTH.curve(&x);
        let err = BackgroundSubtractor::default()
            .estimate(&x, &y, &[FeaturePoint::new(20.0, 0.0), FeaturePoint::new(95.0, 0.0)])
            .unwrap_err();
        match err {
            IrisError::Bounds {
                index,
                x,
                start,
                end,
                len,
            } => {
                assert_eq!((index, x), (1, 95.0));
                assert_eq!((start, end, len), (75, 115, 101));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_fit_names_the_feature() {
        let x = axis();
        let mut y = TRUTH.curve(&x);
        y[30] = f64::NAN;
        let err = BackgroundSubtractor::default()
            .estimate(&x, &y, &[FeaturePoint::new(20.0, 0.0)])
            .unwrap_err();
        match err {
            IrisError::FitConvergence { index, x, source } => {
                assert_eq!((index, x), (0, 20.0));
                assert_eq!(source, CurveFitError::NonFiniteInput);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let x = axis();
        let y = TRUTH.curve(&x);
        let sub = BackgroundSubtractor::default();

        let cases = [
            sub.estimate(&x, &y, &[]),
            sub.estimate(&[], &[], &[FeaturePoint::new(1.0, 0.0)]),
            sub.estimate(&x, &y[..50], &[FeaturePoint::new(20.0, 0.0)]),
            sub.estimate(&x, &y, &[FeaturePoint::new(f64::NAN, 0.0)]),
        ];
        for result in cases {
            assert!(matches!(result, Err(IrisError::DegenerateInput(_))));
        }
    }

    #[test]
    fn subtracting_leaves_the_peak() {
        let x = axis();
        let y = TRUTH.curve(&x);
        let curve = BackgroundSubtractor::default()
            .estimate(&x, &y, &[FeaturePoint::new(20.0, 0.0)])
            .unwrap();
        let peak = curve.subtract(&y);
        assert!((peak[20] - 50.0).abs() < 1e-3);
    }
}

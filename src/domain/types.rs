//! Shared domain types.
//!
//! Everything here is plain data: constructed from caller-supplied arrays and
//! parameters, returned by value, never cached between calls. Configs derive
//! `Serialize`/`Deserialize` so a calling layer can persist them next to the
//! profiles it stores.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::math::{LmConfig, SimplexConfig};
use crate::models::PseudoVoigt;

/// One detector frame, indexed `(row, column)`; rows increase downward.
pub type Image = DMatrix<f64>;

/// Pattern center in pixel coordinates: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub x: f64,
    pub y: f64,
}

impl Center {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Coarse center and ring radius supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterGuess {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl CenterGuess {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }
}

/// Output of center refinement.
///
/// `radius` is always the radius of the guess; only the position is refined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinedCenter {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Mean intensity on the sampled contour at the optimum.
    pub contour_mean: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

impl RefinedCenter {
    pub fn center(&self) -> Center {
        Center::new(self.x, self.y)
    }
}

/// Radially averaged intensity: `radius` strictly increasing, paired by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadialProfile {
    pub radius: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl RadialProfile {
    pub fn len(&self) -> usize {
        self.radius.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }

    /// Intensity of the bin at exactly `radius`, if present.
    pub fn at(&self, radius: f64) -> Option<f64> {
        self.radius
            .iter()
            .position(|&r| r == radius)
            .map(|i| self.intensity[i])
    }
}

/// User-marked diffraction feature; only `x` is used for background fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeaturePoint {
    pub x: f64,
    pub y: f64,
}

impl FeaturePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Samples around one feature and the pseudo-Voigt fitted to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedChunk {
    pub feature_index: usize,
    pub feature_x: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub params: PseudoVoigt,
}

/// Background estimated over the full x-domain of the input curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundCurve {
    pub x: Vec<f64>,
    pub background: Vec<f64>,
    pub chunks: Vec<FittedChunk>,
}

impl BackgroundCurve {
    /// `y - background`, point by point.
    pub fn subtract(&self, y: &[f64]) -> Vec<f64> {
        y.iter()
            .zip(self.background.iter())
            .map(|(a, b)| a - b)
            .collect()
    }
}

/// Center refinement settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Divides the guess before handing it to the optimizer and multiplies
    /// the optimizer's answer back.
    pub scale_factor: f64,
    /// Multiplies the optimizer's coordinates inside the contour cost.
    ///
    /// Equal to `scale_factor` by default, which makes the two mappings cancel.
    pub cost_scale_factor: f64,
    /// Band half-width in squared-pixel units: `|d² - r²| < tolerance`.
    pub contour_tolerance: f64,
    /// Only rows strictly greater than this index are sampled.
    pub row_cutoff: usize,
    pub simplex: SimplexConfig,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            scale_factor: 20.0,
            cost_scale_factor: 20.0,
            contour_tolerance: 10.0,
            row_cutoff: 550,
            simplex: SimplexConfig::default(),
        }
    }
}

/// How radial bins are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinCount {
    /// Every bin count starts at 1, biasing each mean low by one extra unit in
    /// the denominator. Every radius present in the full grid gets a bin.
    #[default]
    PreSeeded,
    /// Counts start at 0 and bins that received no pixel are omitted.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RadialConfig {
    pub bin_count: BinCount,
}

/// Where the pseudo-Voigt center is seeded for each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeakCenterSeed {
    /// `(max(window_x) - min(window_x)) / 2`, the half-span of the window.
    #[default]
    WindowHalfSpan,
    /// The x-position of the feature point.
    FeatureX,
}

/// Background subtraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Half-width of each chunk, in samples.
    pub chunk_size: usize,
    pub center_seed: PeakCenterSeed,
    pub lm: LmConfig,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            center_seed: PeakCenterSeed::default(),
            lm: LmConfig::default(),
        }
    }
}

/// Everything the per-frame pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub refiner: RefinerConfig,
    pub radial: RadialConfig,
    pub background: BackgroundConfig,
    /// Feature positions on the radial axis; background fitting is skipped
    /// when empty.
    pub features: Vec<FeaturePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let refiner = RefinerConfig::default();
        assert_eq!(refiner.scale_factor, 20.0);
        assert_eq!(refiner.cost_scale_factor, 20.0);
        assert_eq!(refiner.contour_tolerance, 10.0);
        assert_eq!(refiner.row_cutoff, 550);

        let background = BackgroundConfig::default();
        assert_eq!(background.chunk_size, 20);
        assert_eq!(background.center_seed, PeakCenterSeed::WindowHalfSpan);

        assert_eq!(RadialConfig::default().bin_count, BinCount::PreSeeded);
    }

    #[test]
    fn process_config_round_trips_through_json() {
        let config = ProcessConfig {
            features: vec![FeaturePoint::new(200.0, 0.0)],
            ..ProcessConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"bin_count\":\"pre-seeded\""));
        let back: ProcessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn subtract_is_pointwise() {
        let curve = BackgroundCurve {
            x: vec![0.0, 1.0, 2.0],
            background: vec![1.0, 2.0, 3.0],
            chunks: Vec::new(),
        };
        assert_eq!(curve.subtract(&[5.0, 5.0, 5.0]), vec![4.0, 3.0, 2.0]);
    }
}

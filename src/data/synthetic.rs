//! Synthetic diffraction frames and radial curves.
//!
//! Frames are a Gaussian-profile ring on a flat background, optionally with
//! additive Gaussian noise. A frame series drifts the ring center linearly
//! from frame to frame, which is what a pump-probe run looks like when the
//! beam wanders.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::Image;
use crate::error::{IrisError, Result};
use crate::models::{Biexponential, PseudoVoigt};

/// One ring on a square frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    pub size: usize,
    /// Column of the ring center.
    pub center_x: f64,
    /// Row of the ring center.
    pub center_y: f64,
    pub radius: f64,
    /// Standard deviation of the radial ring profile, in pixels.
    pub width: f64,
    pub amplitude: f64,
    pub background: f64,
}

impl Default for RingSpec {
    fn default() -> Self {
        Self {
            size: 1024,
            center_x: 512.0,
            center_y: 512.0,
            radius: 200.0,
            width: 12.0,
            amplitude: 100.0,
            background: 5.0,
        }
    }
}

/// Noise-free ring image.
pub fn ring_image(spec: &RingSpec) -> Image {
    let two_var = 2.0 * spec.width * spec.width;
    Image::from_fn(spec.size, spec.size, |i, j| {
        let d = (j as f64 - spec.center_x).hypot(i as f64 - spec.center_y);
        let u = d - spec.radius;
        spec.background + spec.amplitude * (-(u * u) / two_var).exp()
    })
}

/// Ring image with additive `N(0, noise_sd)` noise drawn from `rng`.
pub fn noisy_ring_image(spec: &RingSpec, noise_sd: f64, rng: &mut StdRng) -> Result<Image> {
    let mut image = ring_image(spec);
    if noise_sd > 0.0 {
        let normal = normal(noise_sd)?;
        for v in image.iter_mut() {
            *v += normal.sample(rng);
        }
    }
    Ok(image)
}

/// Settings for a series of frames whose ring center drifts linearly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSeriesSpec {
    pub frames: usize,
    pub ring: RingSpec,
    /// Center displacement per frame, `(dx, dy)` in pixels.
    pub drift: (f64, f64),
    pub noise_sd: f64,
    pub seed: u64,
}

/// A generated frame and the center it was drawn around.
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    pub index: usize,
    pub image: Image,
    pub true_center: (f64, f64),
}

/// Generate every frame of the series.
///
/// Each frame gets its own RNG stream derived from `seed` and the frame index,
/// so the same frame is reproduced regardless of how many frames are asked for.
pub fn frame_series(spec: &FrameSeriesSpec) -> Result<Vec<SyntheticFrame>> {
    if spec.ring.size == 0 {
        return Err(IrisError::InvalidArgument("frame size must be > 0".to_string()));
    }
    (0..spec.frames)
        .map(|index| {
            let t = index as f64;
            let ring = RingSpec {
                center_x: spec.ring.center_x + spec.drift.0 * t,
                center_y: spec.ring.center_y + spec.drift.1 * t,
                ..spec.ring
            };
            let mut rng = StdRng::seed_from_u64(frame_seed(spec.seed, index));
            let image = noisy_ring_image(&ring, spec.noise_sd, &mut rng)?;
            Ok(SyntheticFrame {
                index,
                image,
                true_center: (ring.center_x, ring.center_y),
            })
        })
        .collect()
}

/// Pseudo-Voigt peak sampled on `x` with additive `N(0, noise_sd)` noise.
pub fn noisy_peak(peak: &PseudoVoigt, x: &[f64], noise_sd: f64, rng: &mut StdRng) -> Result<Vec<f64>> {
    let mut y = peak.curve(x);
    if noise_sd > 0.0 {
        let normal = normal(noise_sd)?;
        for v in &mut y {
            *v += normal.sample(rng);
        }
    }
    Ok(y)
}

/// A decaying biexponential baseline with pseudo-Voigt peaks on top.
///
/// This is the shape a radially averaged diffraction curve typically has:
/// inelastic scattering falling off with radius, Bragg rings as peaks.
pub fn diffraction_curve(x: &[f64], baseline: &Biexponential, peaks: &[PseudoVoigt]) -> Vec<f64> {
    x.iter()
        .map(|&xi| {
            baseline.eval(xi)
                + peaks
                    .iter()
                    .map(|p| p.eval(xi) - p.constant)
                    .sum::<f64>()
        })
        .collect()
}

fn normal(sd: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, sd)
        .map_err(|e| IrisError::InvalidArgument(format!("noise distribution error: {e}")))
}

fn frame_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

//! Radial averaging around a known center.
//!
//! Pixel distances are rounded half-to-even onto integer bins. The bin set is
//! every rounded radius present anywhere in the frame, but only the bottom
//! half (rows at or below the center row) contributes intensity.

use tracing::trace;

use crate::domain::{BinCount, Center, Image, RadialConfig, RadialProfile};
use crate::error::{IrisError, Result};
use crate::pattern::Mask;

#[derive(Debug, Clone, Copy, Default)]
pub struct RadialAverager {
    config: RadialConfig,
}

impl RadialAverager {
    pub fn new(config: RadialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RadialConfig {
        &self.config
    }

    /// Azimuthally average `image` around `center`.
    ///
    /// An empty image yields an empty profile.
    pub fn average(
        &self,
        image: &Image,
        center: Center,
        mask: Option<&Mask>,
    ) -> Result<RadialProfile> {
        if let Some(mask) = mask {
            if mask.shape() != image.shape() {
                return Err(IrisError::DegenerateInput(format!(
                    "mask shape {:?} does not match image shape {:?}",
                    mask.shape(),
                    image.shape()
                )));
            }
        }
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(IrisError::InvalidArgument(format!(
                "center ({}, {}) is not finite",
                center.x, center.y
            )));
        }
        if image.is_empty() {
            return Ok(RadialProfile::default());
        }

        let (rows, cols) = image.shape();
        let bin_of = |i: usize, j: usize| -> i64 {
            (j as f64 - center.x)
                .hypot(i as f64 - center.y)
                .round_ties_even() as i64
        };

        let mut r_min = i64::MAX;
        let mut r_max = i64::MIN;
        for i in 0..rows {
            for j in 0..cols {
                let r = bin_of(i, j);
                r_min = r_min.min(r);
                r_max = r_max.max(r);
            }
        }

        let nbins = (r_max - r_min + 1) as usize;
        let mut present = vec![false; nbins];
        let mut sums = vec![0.0; nbins];
        let seed = match self.config.bin_count {
            BinCount::PreSeeded => 1.0,
            BinCount::Exact => 0.0,
        };
        let mut counts = vec![seed; nbins];

        for i in 0..rows {
            let bottom = i as f64 >= center.y;
            for j in 0..cols {
                let k = (bin_of(i, j) - r_min) as usize;
                present[k] = true;
                if !bottom || mask.is_some_and(|m| m.is_masked(i, j)) {
                    continue;
                }
                sums[k] += image[(i, j)];
                counts[k] += 1.0;
            }
        }

        let mut profile = RadialProfile::default();
        for k in 0..nbins {
            if !present[k] || counts[k] == 0.0 {
                continue;
            }
            profile.radius.push((r_min + k as i64) as f64);
            profile.intensity.push(sums[k] / counts[k]);
        }

        trace!(
            bins = profile.len(),
            x = center.x,
            y = center.y,
            "radial average"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constant `value` on pixels whose rounded distance is `radius`, zero elsewhere.
    fn thin_ring(size: usize, center: Center, radius: f64, value: f64) -> Image {
        Image::from_fn(size, size, |i, j| {
            let d = (j as f64 - center.x).hypot(i as f64 - center.y);
            if d.round_ties_even() == radius { value } else { 0.0 }
        })
    }

    /// Pixels with rounded distance `radius` in rows at or below the center.
    fn bottom_count(size: usize, center: Center, radius: f64) -> usize {
        let mut n = 0;
        for i in 0..size {
            for j in 0..size {
                let d = (j as f64 - center.x).hypot(i as f64 - center.y);
                if i as f64 >= center.y && d.round_ties_even() == radius {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn thin_ring_carries_the_pre_seeded_bias() {
        let center = Center::new(32.0, 32.0);
        let image = thin_ring(65, center, 20.0, 7.0);
        let profile = RadialAverager::default()
            .average(&image, center, None)
            .unwrap();

        let n = bottom_count(65, center, 20.0) as f64;
        let got = profile.at(20.0).unwrap();
        assert!((got - 7.0 * n / (n + 1.0)).abs() < 1e-12, "got {got}");
        assert_eq!(profile.at(10.0), Some(0.0));
    }

    #[test]
    fn exact_count_recovers_the_ring_value() {
        let center = Center::new(32.0, 32.0);
        let image = thin_ring(65, center, 20.0, 7.0);
        let averager = RadialAverager::new(RadialConfig {
            bin_count: BinCount::Exact,
        });
        let profile = averager.average(&image, center, None).unwrap();
        assert!((profile.at(20.0).unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn bins_are_unique_and_ascending() {
        let center = Center::new(10.3, 4.7);
        let image = Image::from_fn(16, 24, |i, j| (i + j) as f64);
        let profile = RadialAverager::default()
            .average(&image, center, None)
            .unwrap();
        assert!(!profile.is_empty());
        assert!(profile.radius.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(profile.radius.len(), profile.intensity.len());
    }

    #[test]
    fn top_half_does_not_contribute() {
        let center = Center::new(8.0, 8.0);
        // Bright only above the center row.
        let image = Image::from_fn(17, 17, |i, _| if i < 8 { 100.0 } else { 1.0 });
        let averager = RadialAverager::new(RadialConfig {
            bin_count: BinCount::Exact,
        });
        let profile = averager.average(&image, center, None).unwrap();
        assert!(profile.intensity.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn exact_count_drops_bins_only_seen_above_center() {
        // Center on the last row: radii beyond the bottom rows exist only above it.
        let center = Center::new(0.0, 9.0);
        let image = Image::from_element(10, 3, 1.0);
        let seeded = RadialAverager::default()
            .average(&image, center, None)
            .unwrap();
        let exact = RadialAverager::new(RadialConfig {
            bin_count: BinCount::Exact,
        })
        .average(&image, center, None)
        .unwrap();

        assert_eq!(seeded.radius.last(), Some(&9.0));
        assert_eq!(seeded.at(9.0), Some(0.0));
        assert_eq!(exact.radius, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn averaging_is_idempotent() {
        let center = Center::new(20.5, 18.25);
        let image = Image::from_fn(40, 40, |i, j| ((i * 31 + j * 17) % 13) as f64 * 0.37);
        let averager = RadialAverager::default();
        let a = averager.average(&image, center, None).unwrap();
        let b = averager.average(&image, center, None).unwrap();
        assert_eq!(a.radius, b.radius);
        assert!(
            a.intensity
                .iter()
                .zip(&b.intensity)
                .all(|(x, y)| x.to_bits() == y.to_bits())
        );
    }

    #[test]
    fn masked_pixels_are_skipped() {
        let center = Center::new(16.0, 16.0);
        let mut image = Image::from_element(33, 33, 2.0);
        image[(20, 16)] = 1000.0;
        let mask = Mask::new(33, 33).with_circle(20.0, 16.0, 0.0);
        let averager = RadialAverager::new(RadialConfig {
            bin_count: BinCount::Exact,
        });
        let profile = averager.average(&image, center, Some(&mask)).unwrap();
        assert_eq!(profile.at(4.0), Some(2.0));
    }

    #[test]
    fn empty_image_gives_empty_profile() {
        let profile = RadialAverager::default()
            .average(&Image::zeros(0, 0), Center::new(0.0, 0.0), None)
            .unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn mismatched_mask_is_degenerate() {
        let err = RadialAverager::default()
            .average(
                &Image::zeros(4, 4),
                Center::new(1.0, 1.0),
                Some(&Mask::new(3, 4)),
            )
            .unwrap_err();
        assert!(matches!(err, IrisError::DegenerateInput(_)));
    }
}

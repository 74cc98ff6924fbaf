//! Per-frame processing shared by the CLI and library callers.
//!
//! One frame goes through:
//! center refinement -> radial average -> (optional) background estimation
//!
//! The core modules are single-call and stateless; fanning out over frames
//! happens here, one independent chain per frame.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::data::{FrameSeriesSpec, frame_series};
use crate::domain::{
    BackgroundCurve, CenterGuess, Image, ProcessConfig, RadialProfile, RefinedCenter,
};
use crate::error::Result;
use crate::fit::BackgroundSubtractor;
use crate::pattern::{CenterRefiner, Mask, RadialAverager};

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub index: usize,
    pub center: RefinedCenter,
    pub profile: RadialProfile,
    /// Present when the config lists feature points.
    pub background: Option<BackgroundCurve>,
}

/// Refine, average and (if features are configured) estimate the background.
pub fn process_frame(
    index: usize,
    image: &Image,
    guess: CenterGuess,
    mask: Option<&Mask>,
    config: &ProcessConfig,
) -> Result<FrameResult> {
    let center = CenterRefiner::new(config.refiner).refine(image, guess, mask)?;
    let profile = RadialAverager::new(config.radial).average(image, center.center(), mask)?;

    let background = if config.features.is_empty() {
        None
    } else {
        Some(BackgroundSubtractor::new(config.background).estimate(
            &profile.radius,
            &profile.intensity,
            &config.features,
        )?)
    };

    Ok(FrameResult {
        index,
        center,
        profile,
        background,
    })
}

/// Process every frame in parallel; results keep the frame order.
///
/// A failing frame does not stop the others.
pub fn process_frames(
    frames: &[Image],
    guess: CenterGuess,
    mask: Option<&Mask>,
    config: &ProcessConfig,
) -> Vec<Result<FrameResult>> {
    frames
        .par_iter()
        .enumerate()
        .map(|(index, image)| process_frame(index, image, guess, mask, config))
        .collect()
}

/// Outcome of one synthetic frame, in a serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutcome {
    pub index: usize,
    pub true_center: (f64, f64),
    pub result: Option<FrameResult>,
    pub error: Option<String>,
}

impl FrameOutcome {
    /// Distance between the refined and the true center, in pixels.
    pub fn center_error(&self) -> Option<f64> {
        let c = &self.result.as_ref()?.center;
        Some((c.x - self.true_center.0).hypot(c.y - self.true_center.1))
    }
}

/// All computed outputs of an `iris demo` run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoRun {
    pub series: FrameSeriesSpec,
    pub guess: CenterGuess,
    pub config: ProcessConfig,
    pub frames: Vec<FrameOutcome>,
}

impl DemoRun {
    pub fn failures(&self) -> usize {
        self.frames.iter().filter(|f| f.error.is_some()).count()
    }
}

/// Generate a drifting-ring series and process it.
pub fn run_demo(
    series: &FrameSeriesSpec,
    guess: CenterGuess,
    mask: Option<&Mask>,
    config: &ProcessConfig,
) -> Result<DemoRun> {
    let frames = frame_series(series)?;
    info!(frames = frames.len(), size = series.ring.size, "generated synthetic frames");

    let images: Vec<Image> = frames.iter().map(|f| f.image.clone()).collect();
    let results = process_frames(&images, guess, mask, config);

    let outcomes: Vec<FrameOutcome> = frames
        .iter()
        .zip(results)
        .map(|(frame, result)| match result {
            Ok(r) => FrameOutcome {
                index: frame.index,
                true_center: frame.true_center,
                result: Some(r),
                error: None,
            },
            Err(err) => {
                warn!(frame = frame.index, error = %err, "frame failed");
                FrameOutcome {
                    index: frame.index,
                    true_center: frame.true_center,
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    let run = DemoRun {
        series: *series,
        guess,
        config: config.clone(),
        frames: outcomes,
    };
    info!(failures = run.failures(), "processed frames");
    Ok(run)
}

//! Command-line parsing for the `iris` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! image-processing code. Every tuning knob of the core is exposed as a flag;
//! the most commonly changed ones can also be set through `IRIS_*` variables
//! (read from the environment or a `.env` file).

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "iris",
    version,
    about = "Electron-diffraction center refinement, radial averaging and background subtraction"
)]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is not set (e.g. `info`, `iris=debug`).
    #[arg(long, global = true, env = "IRIS_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synthesize a drifting-ring frame series and process every frame.
    ///
    /// Frames are processed in parallel; each one gets a refined center, a
    /// radial profile and, when `--feature` is given, a background estimate.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of frames in the series.
    #[arg(short = 'n', long, default_value_t = 8)]
    pub frames: usize,

    /// Frame side length (pixels).
    #[arg(long, default_value_t = 1024)]
    pub size: usize,

    /// True ring center column of the first frame.
    #[arg(long, default_value_t = 512.0)]
    pub center_x: f64,

    /// True ring center row of the first frame.
    #[arg(long, default_value_t = 512.0)]
    pub center_y: f64,

    /// Center drift per frame along x (pixels).
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub drift_x: f64,

    /// Center drift per frame along y (pixels).
    #[arg(long, default_value_t = -0.25, allow_negative_numbers = true)]
    pub drift_y: f64,

    /// Ring radius (pixels).
    #[arg(long, default_value_t = 200.0)]
    pub radius: f64,

    /// Radial standard deviation of the ring (pixels).
    #[arg(long, default_value_t = 12.0)]
    pub ring_width: f64,

    /// Ring peak intensity above background.
    #[arg(long, default_value_t = 100.0)]
    pub amplitude: f64,

    /// Flat background level.
    #[arg(long, default_value_t = 5.0)]
    pub background: f64,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Random seed for frame noise.
    #[arg(long, env = "IRIS_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Center guess, x (defaults to the true first-frame center minus 4 px).
    #[arg(long)]
    pub guess_x: Option<f64>,

    /// Center guess, y (defaults to the true first-frame center plus 3 px).
    #[arg(long)]
    pub guess_y: Option<f64>,

    /// Ring radius guess; returned unchanged as the refined radius.
    #[arg(long)]
    pub guess_r: Option<f64>,

    /// Scale factor applied around the optimizer call.
    #[arg(long, env = "IRIS_SCALE_FACTOR", default_value_t = 20.0)]
    pub scale_factor: f64,

    /// Scale factor applied inside the contour cost.
    #[arg(long, env = "IRIS_COST_SCALE_FACTOR", default_value_t = 20.0)]
    pub cost_scale_factor: f64,

    /// Contour band half-width in squared pixels (`|d² - r²| < tolerance`).
    #[arg(long, env = "IRIS_CONTOUR_TOLERANCE", default_value_t = 10.0)]
    pub contour_tolerance: f64,

    /// Only rows below this index are sampled for the contour.
    #[arg(long, env = "IRIS_ROW_CUTOFF", default_value_t = 550)]
    pub row_cutoff: usize,

    /// Mask a beam block of this radius around the true first-frame center.
    #[arg(long)]
    pub beam_block: Option<f64>,

    /// Half-width (samples) of each background fitting window.
    #[arg(long, env = "IRIS_CHUNK_SIZE", default_value_t = 20)]
    pub chunk_size: usize,

    /// Feature position on the radial axis; repeat for several features.
    #[arg(long = "feature", allow_negative_numbers = true)]
    pub features: Vec<f64>,

    /// Normalize radial bins by their exact pixel count.
    #[arg(long)]
    pub exact_bins: bool,

    /// Seed each peak fit at its feature position instead of the window half-span.
    #[arg(long)]
    pub seed_at_feature: bool,

    /// Print the full run as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

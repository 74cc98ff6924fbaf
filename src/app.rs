//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` overrides
//! - parses CLI arguments
//! - installs the tracing subscriber
//! - runs the frame pipeline and prints the report

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DemoArgs};
use crate::data::{FrameSeriesSpec, RingSpec};
use crate::domain::{
    BackgroundConfig, BinCount, CenterGuess, FeaturePoint, PeakCenterSeed, ProcessConfig,
    RadialConfig, RefinerConfig,
};
use crate::error::{IrisError, Result};
use crate::pattern::Mask;

pub mod pipeline;

/// Entry point for the `iris` binary.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Demo(args) => handle_demo(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second subscriber (e.g. from a test harness) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_demo(args: DemoArgs) -> Result<()> {
    let config = process_config_from_args(&args)?;
    let series = series_from_args(&args);
    let guess = guess_from_args(&args);
    let mask = args.beam_block.map(|r| {
        let mask = Mask::new(args.size, args.size).with_circle(args.center_y, args.center_x, r);
        info!(radius = r, masked = mask.masked_count(), "beam block mask");
        mask
    });

    let run = pipeline::run_demo(&series, guess, mask.as_ref(), &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("{}", crate::report::format_demo_summary(&run));
    }
    Ok(())
}

pub fn process_config_from_args(args: &DemoArgs) -> Result<ProcessConfig> {
    if let Some(x) = args.features.iter().find(|x| !x.is_finite()) {
        return Err(IrisError::InvalidArgument(format!(
            "feature position {x} is not finite"
        )));
    }
    Ok(ProcessConfig {
        refiner: RefinerConfig {
            scale_factor: args.scale_factor,
            cost_scale_factor: args.cost_scale_factor,
            contour_tolerance: args.contour_tolerance,
            row_cutoff: args.row_cutoff,
            ..RefinerConfig::default()
        },
        radial: RadialConfig {
            bin_count: if args.exact_bins {
                BinCount::Exact
            } else {
                BinCount::PreSeeded
            },
        },
        background: BackgroundConfig {
            chunk_size: args.chunk_size,
            center_seed: if args.seed_at_feature {
                PeakCenterSeed::FeatureX
            } else {
                PeakCenterSeed::WindowHalfSpan
            },
            ..BackgroundConfig::default()
        },
        features: args
            .features
            .iter()
            .map(|&x| FeaturePoint::new(x, 0.0))
            .collect(),
    })
}

fn series_from_args(args: &DemoArgs) -> FrameSeriesSpec {
    FrameSeriesSpec {
        frames: args.frames,
        ring: RingSpec {
            size: args.size,
            center_x: args.center_x,
            center_y: args.center_y,
            radius: args.radius,
            width: args.ring_width,
            amplitude: args.amplitude,
            background: args.background,
        },
        drift: (args.drift_x, args.drift_y),
        noise_sd: args.noise,
        seed: args.seed,
    }
}

fn guess_from_args(args: &DemoArgs) -> CenterGuess {
    CenterGuess::new(
        args.guess_x.unwrap_or(args.center_x - 4.0),
        args.guess_y.unwrap_or(args.center_y + 3.0),
        args.guess_r.unwrap_or(args.radius),
    )
}

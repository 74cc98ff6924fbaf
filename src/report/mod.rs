//! Formatted terminal output for pipeline runs.
//!
//! Formatting lives here so the pipeline stays free of presentation and
//! output changes are localized.

use crate::app::pipeline::{DemoRun, FrameOutcome};
use crate::domain::{BinCount, PeakCenterSeed, RadialProfile};

/// Format the full demo summary: inputs, one row per frame, and aggregate error.
pub fn format_demo_summary(run: &DemoRun) -> String {
    let mut out = String::new();
    let ring = &run.series.ring;
    let refiner = &run.config.refiner;

    out.push_str("=== iris - diffraction frame processing ===\n");
    out.push_str(&format!(
        "Frames: n={} | size={}x{} | noise sd={:.2} | seed={}\n",
        run.series.frames, ring.size, ring.size, run.series.noise_sd, run.series.seed
    ));
    out.push_str(&format!(
        "Ring: r={:.1} width={:.1} amplitude={:.1} background={:.1} | drift=({:+.2}, {:+.2}) px/frame\n",
        ring.radius,
        ring.width,
        ring.amplitude,
        ring.background,
        run.series.drift.0,
        run.series.drift.1
    ));
    out.push_str(&format!(
        "Guess: ({:.2}, {:.2}) r={:.2}\n",
        run.guess.x, run.guess.y, run.guess.radius
    ));
    out.push_str(&format!(
        "Refiner: scale={} cost_scale={} tolerance={} row_cutoff={}\n",
        refiner.scale_factor,
        refiner.cost_scale_factor,
        refiner.contour_tolerance,
        refiner.row_cutoff
    ));
    out.push_str(&format!(
        "Radial bins: {} | features: {} | peak seed: {}\n",
        bin_count_name(run.config.radial.bin_count),
        fmt_vec(&run.config.features.iter().map(|f| f.x).collect::<Vec<_>>()),
        seed_name(run.config.background.center_seed),
    ));

    out.push('\n');
    out.push_str(&format_frame_table(&run.frames));

    let errors: Vec<f64> = run.frames.iter().filter_map(FrameOutcome::center_error).collect();
    out.push('\n');
    if errors.is_empty() {
        out.push_str("No frame produced a center.\n");
    } else {
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        let worst = errors.iter().cloned().fold(0.0, f64::max);
        out.push_str(&format!(
            "Center error: mean={mean:.3}px max={worst:.3}px | failed frames: {}\n",
            run.failures()
        ));
    }

    out
}

fn format_frame_table(frames: &[FrameOutcome]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>5} {:>9} {:>9} {:>9} {:>9} {:>7} {:>6} {:>10} {:>10}\n",
            "frame", "true_x", "true_y", "fit_x", "fit_y", "err", "iters", "peak_r", "bg"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<5} {:-<9} {:-<9} {:-<9} {:-<9} {:-<7} {:-<6} {:-<10} {:-<10}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for f in frames {
        let line = match (&f.result, &f.error) {
            (Some(r), _) => {
                let bg = r
                    .background
                    .as_ref()
                    .map(|b| fmt_vec(&b.chunks.iter().map(|c| c.params.constant).collect::<Vec<_>>()))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{:>5} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>7.3} {:>6} {:>10} {:>10}",
                    f.index,
                    f.true_center.0,
                    f.true_center.1,
                    r.center.x,
                    r.center.y,
                    f.center_error().unwrap_or(f64::NAN),
                    r.center.iterations,
                    peak_radius(&r.profile)
                        .map(|p| format!("{p:.0}"))
                        .unwrap_or_else(|| "-".to_string()),
                    bg,
                )
            }
            (None, error) => format!(
                "{:>5} {:>9.2} {:>9.2} failed: {}",
                f.index,
                f.true_center.0,
                f.true_center.1,
                error.as_deref().unwrap_or("unknown error")
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Radius of the brightest bin.
pub fn peak_radius(profile: &RadialProfile) -> Option<f64> {
    profile
        .radius
        .iter()
        .zip(&profile.intensity)
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(r, _)| *r)
}

fn bin_count_name(b: BinCount) -> &'static str {
    match b {
        BinCount::PreSeeded => "pre-seeded",
        BinCount::Exact => "exact",
    }
}

fn seed_name(s: PeakCenterSeed) -> &'static str {
    match s {
        PeakCenterSeed::WindowHalfSpan => "window half-span",
        PeakCenterSeed::FeatureX => "feature x",
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    format!("[{}]", parts.join(", "))
}

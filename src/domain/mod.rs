//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - in-memory inputs (`Image`, `CenterGuess`, `FeaturePoint`)
//! - algorithm outputs (`RefinedCenter`, `RadialProfile`, `BackgroundCurve`)
//! - per-algorithm configuration (`RefinerConfig`, `RadialConfig`, `BackgroundConfig`)

pub mod types;

pub use types::*;

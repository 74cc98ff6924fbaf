//! `iris` library crate.
//!
//! Core processing for electron-diffraction frames:
//!
//! - `pattern`: center refinement and radial averaging on 2D frames
//! - `fit`: curve fitting and inelastic background estimation on profiles
//! - `models`: lineshapes shared by both
//!
//! The binary (`iris`) is a thin wrapper around this library so the core can
//! be driven from any orchestrator without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod pattern;
pub mod report;

pub use error::{IrisError, Result};

//! Curve fitting on one-dimensional profiles.
//!
//! Responsibilities:
//!
//! - generic nonlinear least-squares fitting of a `CurveModel`
//! - inelastic background estimation from pseudo-Voigt fits around features

pub mod background;
pub mod curve;

pub use background::*;
pub use curve::*;

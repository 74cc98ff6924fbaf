//! Numerical building blocks: linear solves, optimizers, interpolation.

pub mod interp;
pub mod levenberg;
pub mod lsq;
pub mod simplex;

pub use interp::*;
pub use levenberg::{LmConfig, LmReport, LmStatus};
pub use lsq::*;
pub use simplex::{SimplexConfig, SimplexReport};

//! Input data for tests and the demo command.
//!
//! The library never reads detector files; callers hand it arrays. This module
//! produces realistic arrays without any I/O.

pub mod synthetic;

pub use synthetic::*;

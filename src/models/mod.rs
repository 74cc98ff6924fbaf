//! Lineshape library and fittable curve models.
//!
//! Lineshapes are implemented as small, pure functions so that fitting code can
//! stay generic over the model.

pub mod lineshape;
pub mod model;

pub use lineshape::*;
pub use model::*;

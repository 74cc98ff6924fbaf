//! Operations on 2D diffraction frames: masking, center refinement and
//! radial averaging.

pub mod center;
pub mod mask;
pub mod radial;

pub use center::{CenterRefiner, ContourError};
pub use mask::Mask;
pub use radial::RadialAverager;

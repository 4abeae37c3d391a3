//! Sample generation for variance-based analysis.
//!
//! [`sample`] builds the radial design in the unit hypercube and
//! [`transform`] maps it onto parameter values the model can evaluate.

mod saltelli;
mod sequence;
mod transform;

pub use saltelli::{DesignMatrix, Problem, sample};
pub use sequence::{LowDiscrepancySequence, MAX_SOBOL_DIMENSION, RandomSequence, SobolSequence};
pub use transform::transform;

pub(crate) use saltelli::group_size;

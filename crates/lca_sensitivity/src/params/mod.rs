//! Parameter definitions and the registry the analyses read them from.
//!
//! Every parameter value is carried as an `f64`: floats as themselves, booleans
//! as `0.0`/`1.0`, and enumerations as the index of the selected label.

mod definition;
mod registry;

pub use definition::{FloatDistribution, ParamDef, ParamKind};
pub use registry::ParamRegistry;

use crate::error::Result;

/// Contract the analyses need from a parameter.
pub trait ParameterSource {
    /// Unique identifier
    fn name(&self) -> &str;

    fn default_value(&self) -> f64;

    /// Map `u` in [0, 1] into the parameter's domain (inverse CDF).
    fn rand(&self, u: f64) -> f64;

    /// Ordered sequence of at most `n` representative values spanning the domain.
    fn range(&self, n: usize) -> Vec<f64>;

    fn unit(&self) -> Option<&str>;

    /// False for parameters pinned at their default during sampling
    fn is_variable(&self) -> bool;

    /// True when `range` values should be read as a continuum (line rather than bars)
    fn is_continuous(&self) -> bool {
        true
    }

    /// Check the definition before it enters a registry
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

//! Sensitivity analysis for parameterized life-cycle impact models
//!
//! This crate quantifies how uncertainty in model parameters propagates to
//! the impacts a model computes. It supports:
//! - One-at-a-time (OAT) sweeps with a relative-change metric
//! - Saltelli sampling over a scrambled Sobol sequence
//! - First, total and second-order Sobol indices with bootstrap intervals
//! - Decomposition of relative variance into per-parameter contributions
//!
//! # Pipeline
//!
//! ```ignore
//! use lca_sensitivity::{
//!     Evaluator, FnModel, ImpactDef, ParamDef, ParamRegistry, SobolConfig, StochasticDashboard,
//! };
//!
//! let registry = ParamRegistry::from_params(vec![
//!     ParamDef::linear("load", 1.0, 0.5, 1.5).with_unit("t"),
//!     ParamDef::enumeration("elec_mix", &["fr", "de", "eu"], "eu"),
//! ])?;
//! let impacts = vec![ImpactDef::new("gwp", "Climate change", "kg CO2-eq")];
//! let model = FnModel::new(["load", "elec_mix"])
//!     .with_impact("gwp", |p| p[0] * [0.06, 0.4, 0.3][p[1] as usize]);
//!
//! let dashboard = StochasticDashboard::new(
//!     &registry,
//!     Evaluator::RawModel(&model),
//!     &impacts,
//!     &SobolConfig::default(),
//! )?;
//! let s1 = dashboard.indices().s1();
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod float_serde;
pub mod sampling;
pub mod stats;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;
pub mod params;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use analysis::{
    Diagnostic, ImportanceMode, OatConfig, OatDashboard, OatSweeper, SensitivityIndices,
    SobolConfig, StochasticDashboard, VarianceDecomposition,
};
pub use error::{EstimationFailure, ModelError, Result, SensitivityError};
pub use model::{CompiledModel, Evaluator, FnModel, ImpactDef, ImpactModel, ImpactTable};
pub use params::{ParamDef, ParamRegistry, ParameterSource};
pub use sampling::{DesignMatrix, Problem};

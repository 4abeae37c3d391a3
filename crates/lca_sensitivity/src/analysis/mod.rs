//! Sensitivity analyses over an impact model.
//!
//! # Global analysis
//!
//! A stochastic run samples every variable parameter with a Saltelli design,
//! evaluates the model once per row and estimates Sobol indices per impact:
//!
//! ```ignore
//! use lca_sensitivity::analysis::{ImportanceMode, SobolConfig, StochasticDashboard};
//! use lca_sensitivity::model::Evaluator;
//!
//! let config = SobolConfig { base_count: 1024, ..Default::default() };
//! println!("{} model evaluations", config.row_count(registry.variable().len()));
//!
//! let dashboard = StochasticDashboard::new(&registry, Evaluator::RawModel(&model), &impacts, &config)?;
//! let importance = dashboard.importance(ImportanceMode::Percent)?;
//! let variations = dashboard.variations()?.summary_table();
//! ```
//!
//! # One-at-a-time analysis
//!
//! `OatSweeper` captures the registry defaults once, then sweeps one parameter
//! at a time over its `range`:
//!
//! ```ignore
//! let sweeper = OatSweeper::new(&registry, &compiled, &impacts, OatConfig::default());
//! let matrix = sweeper.oat_matrix()?;
//! ```
//!
//! # Degenerate ratios
//!
//! Relative change, relative variance and percent deviation share one policy:
//! a zero denominator gives `0.0` over a zero numerator and `+inf` otherwise,
//! recorded as a [`Diagnostic::ZeroDenominator`]. Results never carry NaN.

mod config;
mod diagnostics;
mod oat;
mod report;
mod sobol;
mod stochastic;
mod variance;

pub use config::*;
pub use diagnostics::*;
pub use oat::*;
pub use report::*;
pub use sobol::*;
pub use stochastic::*;
pub use variance::*;

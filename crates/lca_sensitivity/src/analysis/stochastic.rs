//! End-to-end stochastic run: sample, transform, evaluate.

use serde::Serialize;

use super::{SensitivityIndices, SobolConfig, sobol};
use crate::error::Result;
use crate::model::{Evaluator, ImpactDef, ImpactTable};
use crate::params::{ParamRegistry, ParameterSource};
use crate::sampling::{DesignMatrix, Problem, sample, transform};

/// Design and model outputs of one stochastic run.
///
/// Output rows align with design rows; nothing downstream reorders them.
#[derive(Debug, Clone, Serialize)]
pub struct StochasticRun {
    design: DesignMatrix,
    outputs: ImpactTable,
}

impl StochasticRun {
    pub fn problem(&self) -> &Problem {
        self.design.problem()
    }

    pub fn design(&self) -> &DesignMatrix {
        &self.design
    }

    pub fn outputs(&self) -> &ImpactTable {
        &self.outputs
    }

    /// Sobol indices of the run's outputs.
    pub fn sobol(&self, config: &SobolConfig) -> Result<SensitivityIndices> {
        let config = SobolConfig {
            calc_second_order: self.design.is_second_order(),
            ..config.clone()
        };
        sobol::analyze(self.problem(), &self.outputs, &config)
    }
}

/// Sample every variable registry parameter and evaluate the model.
///
/// The sampling cost is `config.row_count(k)` model evaluations, logged before
/// evaluation starts.
pub fn stochastics<'a, P: ParameterSource>(
    registry: &ParamRegistry<P>,
    evaluator: impl Into<Evaluator<'a>>,
    impacts: &[ImpactDef],
    config: &SobolConfig,
) -> Result<StochasticRun> {
    let evaluator = evaluator.into();
    let names: Vec<String> = registry
        .variable()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    let problem = Problem::new(names.iter().cloned())?;

    let design = sample(&problem, config)?;
    let assignment = transform(&design, &names, registry)?;

    tracing::info!(
        rows = design.rows(),
        impacts = impacts.len(),
        "Evaluating model"
    );
    let outputs = evaluator.evaluate(&assignment, impacts)?;

    Ok(StochasticRun { design, outputs })
}

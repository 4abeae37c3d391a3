//! Report tables and the selection-to-report functions front ends call.
//!
//! A front end picks a parameter or a display mode and gets back plain
//! labelled numbers; rendering is entirely its business.

use ndarray::Array2;
use serde::Serialize;

use super::variance::impact_labels;
use super::{
    DeviationMatrix, Diagnostic, ImportanceMode, OatConfig, OatMatrix, OatSweeper,
    SensitivityIndices, SobolConfig, StochasticRun, VarianceDecomposition, stochastics, variance,
};
use crate::error::{Result, SensitivityError};
use crate::model::{Evaluator, ImpactDef};
use crate::params::{ParamDef, ParamRegistry, ParameterSource};
use crate::stats::{self, Summary};

/// Numeric matrix with ordered row and column labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    title: String,
    row_labels: Vec<String>,
    column_labels: Vec<String>,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    values: Array2<f64>,
}

impl ReportTable {
    pub fn new(
        title: impl Into<String>,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        Self {
            title: title.into(),
            row_labels,
            column_labels,
            values,
        }
    }

    /// Build from one `Vec` per row; ragged rows or a shape that disagrees
    /// with the labels are an `InvalidArgument`.
    pub(crate) fn from_rows(
        title: impl Into<String>,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let shape = (row_labels.len(), column_labels.len());
        if rows.len() != shape.0 || rows.iter().any(|r| r.len() != shape.1) {
            return Err(SensitivityError::invalid(format!(
                "report rows do not form a {} x {} table",
                shape.0, shape.1
            )));
        }
        let values = Array2::from_shape_vec(shape, rows.into_iter().flatten().collect())
            .map_err(|e| SensitivityError::invalid(e.to_string()))?;
        Ok(Self::new(title, row_labels, column_labels, values))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.column_labels.iter().position(|l| l == column)?;
        self.values.get((r, c)).copied()
    }

    /// Rows become columns, as heatmaps display impacts against parameters
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            title: self.title.clone(),
            row_labels: self.column_labels.clone(),
            column_labels: self.row_labels.clone(),
            values: self.values.t().to_owned(),
        }
    }
}

/// Everything the OAT view of one parameter shows.
#[derive(Debug, Clone, Serialize)]
pub struct OatReport {
    /// `name [unit]` of the swept parameter
    pub label: String,
    /// Draw as a line rather than bars
    pub continuous: bool,
    /// Impacts per swept value, one row per value
    pub data: ReportTable,
    /// Relative change per impact, in percent
    pub change: ReportTable,
}

/// OAT analysis of one model, one parameter at a time.
#[derive(Debug)]
pub struct OatDashboard<'a, P = ParamDef> {
    sweeper: OatSweeper<'a, P>,
}

impl<'a, P: ParameterSource> OatDashboard<'a, P> {
    pub fn new(
        registry: &'a ParamRegistry<P>,
        evaluator: impl Into<Evaluator<'a>>,
        impacts: &'a [ImpactDef],
        config: OatConfig,
    ) -> Self {
        Self {
            sweeper: OatSweeper::new(registry, evaluator, impacts, config),
        }
    }

    /// Parameters a front end may offer for selection
    pub fn parameters(&self) -> Result<Vec<String>> {
        self.sweeper.swept_parameters()
    }

    pub fn report(&self, parameter: &str) -> Result<OatReport> {
        let sweep = self.sweeper.sweep(parameter)?;
        let label = sweep.label();
        let impacts = sweep.outputs().impacts();

        let data = ReportTable::new(
            label.clone(),
            sweep.values().iter().map(|v| v.to_string()).collect(),
            impact_labels(impacts),
            sweep.outputs().values().clone(),
        );
        let change = ReportTable::from_rows(
            format!("Relative change for {label}"),
            impact_labels(impacts),
            vec!["Relative change of the median value (%)".to_string()],
            sweep.relative_change().iter().map(|&v| vec![v]).collect(),
        )?;

        Ok(OatReport {
            label,
            continuous: sweep.is_continuous(),
            data,
            change,
        })
    }

    pub fn matrix(&self) -> Result<OatMatrix> {
        self.sweeper.oat_matrix()
    }
}

/// Distribution of one impact over a stochastic run.
///
/// The summary covers finite outputs only; `non_finite` counts the rest and
/// a non-zero count comes with a [`Diagnostic::NonFiniteOutput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactDistribution {
    pub impact: ImpactDef,
    pub summary: Summary,
    pub non_finite: usize,
    pub diagnostic: Option<Diagnostic>,
}

/// Stochastic analysis computed once, then viewed in several ways.
#[derive(Debug, Clone, Serialize)]
pub struct StochasticDashboard {
    run: StochasticRun,
    indices: SensitivityIndices,
}

impl StochasticDashboard {
    /// Run the sampling, the model and the Sobol estimation.
    pub fn new<'a, P: ParameterSource>(
        registry: &ParamRegistry<P>,
        evaluator: impl Into<Evaluator<'a>>,
        impacts: &[ImpactDef],
        config: &SobolConfig,
    ) -> Result<Self> {
        let run = stochastics(registry, evaluator, impacts, config)?;
        let indices = run.sobol(config)?;
        Ok(Self { run, indices })
    }

    pub fn run(&self) -> &StochasticRun {
        &self.run
    }

    pub fn indices(&self) -> &SensitivityIndices {
        &self.indices
    }

    /// Parameter importance from total-order indices
    pub fn importance(&self, mode: ImportanceMode) -> Result<DeviationMatrix> {
        variance::deviation_matrix(
            self.run.outputs(),
            self.indices.names(),
            self.indices.st(),
            mode,
        )
    }

    /// Relative variance split by first-order indices
    pub fn variations(&self) -> Result<VarianceDecomposition> {
        variance::decompose(self.run.outputs(), self.indices.names(), self.indices.s1())
    }

    /// Per-impact distribution summaries
    pub fn distributions(&self) -> Vec<ImpactDistribution> {
        self.run
            .outputs()
            .columns()
            .map(|(impact, column)| {
                let non_finite = stats::non_finite_count(column);
                ImpactDistribution {
                    impact: impact.clone(),
                    summary: Summary::from_values(column),
                    non_finite,
                    diagnostic: (non_finite > 0)
                        .then(|| Diagnostic::non_finite_output(&impact.id, None, non_finite)),
                }
            })
            .collect()
    }
}

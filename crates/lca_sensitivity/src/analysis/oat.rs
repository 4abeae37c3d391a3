//! One-at-a-time sweeps around a captured baseline.
//!
//! Every sweep holds all parameters at the same baseline snapshot and walks a
//! single parameter across its `range`. The spread of each impact over the
//! sweep is summarized as `(max - min) / median * 100`. A sweep that hits a
//! NaN or infinite output reports zero change for that impact together with
//! a [`Diagnostic::NonFiniteOutput`].

use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::{Diagnostic, OatConfig, RatioMetric};
use crate::error::{Result, SensitivityError};
use crate::model::{Evaluator, ImpactDef, ImpactTable, ParamAssignment, ParamValue};
use crate::params::{ParamDef, ParamRegistry, ParameterSource};
use crate::stats;

/// Default values of every registry parameter, read once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    values: FxHashMap<String, f64>,
}

impl Baseline {
    pub fn capture<P: ParameterSource>(registry: &ParamRegistry<P>) -> Self {
        let values = registry
            .all()
            .iter()
            .map(|p| (p.name().to_string(), p.default_value()))
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// The snapshot as an all-scalar assignment
    pub fn assignment(&self) -> ParamAssignment {
        let mut assignment = ParamAssignment::new();
        for (name, value) in &self.values {
            assignment.insert(name.clone(), ParamValue::Scalar(*value));
        }
        assignment
    }
}

/// Outputs of one parameter's sweep.
#[derive(Debug, Clone, Serialize)]
pub struct OatSweep {
    parameter: String,
    unit: Option<String>,
    continuous: bool,
    values: Vec<f64>,
    outputs: ImpactTable,
    #[serde(with = "crate::float_serde::vec")]
    relative_change: Vec<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl OatSweep {
    fn new(
        parameter: String,
        unit: Option<String>,
        continuous: bool,
        values: Vec<f64>,
        outputs: ImpactTable,
    ) -> Self {
        let mut diagnostics = Vec::new();
        let relative_change = outputs
            .columns()
            .map(|(impact, column)| {
                let non_finite = stats::non_finite_count(column);
                if non_finite > 0 {
                    diagnostics.push(Diagnostic::non_finite_output(
                        &impact.id,
                        Some(parameter.as_str()),
                        non_finite,
                    ));
                    return 0.0;
                }
                let ratio = stats::relative_change_pct(column);
                if ratio.zero_denominator && ratio.value != 0.0 {
                    diagnostics.push(Diagnostic::zero_denominator(
                        &impact.id,
                        Some(parameter.as_str()),
                        RatioMetric::RelativeChange,
                    ));
                }
                ratio.value
            })
            .collect();

        Self {
            parameter,
            unit,
            continuous,
            values,
            outputs,
            relative_change,
            diagnostics,
        }
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Axis label, `name [unit]` when the parameter has a unit
    pub fn label(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} [{}]", self.parameter, unit),
            None => self.parameter.clone(),
        }
    }

    /// Whether the swept values form a continuum or discrete levels
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Swept parameter values, one per output row
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn outputs(&self) -> &ImpactTable {
        &self.outputs
    }

    /// `(max - min) / median * 100` per impact
    pub fn relative_change(&self) -> &[f64] {
        &self.relative_change
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Relative change of every swept parameter against every impact.
#[derive(Debug, Clone, Serialize)]
pub struct OatMatrix {
    parameters: Vec<String>,
    labels: Vec<String>,
    impacts: Vec<ImpactDef>,
    #[serde(with = "crate::float_serde::matrix")]
    values: Array2<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl OatMatrix {
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Row labels with units
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn impacts(&self) -> &[ImpactDef] {
        &self.impacts
    }

    /// Parameters x impacts, in percent
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn get(&self, parameter: &str, impact_id: &str) -> Option<f64> {
        let row = self.parameters.iter().position(|p| p == parameter)?;
        let col = self.impacts.iter().position(|i| i.id == impact_id)?;
        self.values.get((row, col)).copied()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Runs sweeps against one evaluator from one baseline snapshot.
#[derive(Debug)]
pub struct OatSweeper<'a, P = ParamDef> {
    registry: &'a ParamRegistry<P>,
    evaluator: Evaluator<'a>,
    impacts: &'a [ImpactDef],
    baseline: Baseline,
    config: OatConfig,
}

impl<'a, P: ParameterSource> OatSweeper<'a, P> {
    /// Capture the baseline; later sweeps never re-read registry defaults.
    pub fn new(
        registry: &'a ParamRegistry<P>,
        evaluator: impl Into<Evaluator<'a>>,
        impacts: &'a [ImpactDef],
        config: OatConfig,
    ) -> Self {
        Self {
            registry,
            evaluator: evaluator.into(),
            impacts,
            baseline: Baseline::capture(registry),
            config,
        }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Sweep `name` over `range(steps)` with every other parameter at baseline.
    pub fn sweep(&self, name: &str) -> Result<OatSweep> {
        if self.config.steps == 0 {
            return Err(SensitivityError::invalid("OAT sweep needs at least one step"));
        }
        let param = self.registry.require(name)?;
        let values = param.range(self.config.steps);

        tracing::debug!(parameter = name, steps = values.len(), "Sweeping parameter");

        let mut assignment = self.baseline.assignment();
        assignment.insert(name, ParamValue::Vector(values.clone()));
        let outputs = self.evaluator.evaluate(&assignment, self.impacts)?;

        Ok(OatSweep::new(
            name.to_string(),
            param.unit().map(str::to_string),
            param.is_continuous(),
            values,
            outputs,
        ))
    }

    /// Variable registry parameters the model actually reads, registry order
    pub fn swept_parameters(&self) -> Result<Vec<String>> {
        let required = self.evaluator.required_params();
        let known: Vec<&String> = required
            .iter()
            .filter(|name| self.registry.get(name).is_some())
            .collect();
        Ok(self
            .registry
            .variable_among(&known)?
            .into_iter()
            .map(|p| p.name().to_string())
            .collect())
    }

    /// One sweep per swept parameter
    pub fn sweep_all(&self) -> Result<Vec<OatSweep>> {
        self.swept_parameters()?
            .iter()
            .map(|name| self.sweep(name))
            .collect()
    }

    /// Relative change matrix over all swept parameters.
    pub fn oat_matrix(&self) -> Result<OatMatrix> {
        let sweeps = self.sweep_all()?;
        tracing::info!(
            parameters = sweeps.len(),
            impacts = self.impacts.len(),
            steps = self.config.steps,
            "Computed OAT matrix"
        );

        let mut values = Array2::zeros((sweeps.len(), self.impacts.len()));
        for (mut row, sweep) in values.rows_mut().into_iter().zip(&sweeps) {
            row.assign(&ndarray::aview1(sweep.relative_change()));
        }
        Ok(OatMatrix {
            parameters: sweeps.iter().map(|s| s.parameter().to_string()).collect(),
            labels: sweeps.iter().map(OatSweep::label).collect(),
            impacts: self.impacts.to_vec(),
            values,
            diagnostics: sweeps
                .iter()
                .flat_map(|s| s.diagnostics().iter().cloned())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FnModel, ImpactModel};

    fn impacts() -> Vec<ImpactDef> {
        vec![
            ImpactDef::new("gwp", "Climate change", "kg CO2-eq"),
            ImpactDef::new("water", "Water use", "m3"),
        ]
    }

    fn registry() -> ParamRegistry {
        ParamRegistry::from_params(vec![
            ParamDef::linear("x", 3.0, 1.0, 5.0).with_unit("kg"),
            ParamDef::linear("y", 1.0, 0.0, 2.0),
            ParamDef::fixed("z", 4.0),
            ParamDef::linear("unused", 1.0, 0.0, 2.0),
        ])
        .unwrap()
    }

    fn model() -> FnModel {
        FnModel::new(["x", "y", "z"])
            .with_impact("gwp", |p| p[0])
            .with_impact("water", |p| p[2] + 0.0 * p[1])
    }

    #[test]
    fn test_sweep_relative_change() {
        let reg = registry();
        let impacts = impacts();
        let model = model();
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig { steps: 5 },
        );

        let sweep = sweeper.sweep("x").unwrap();
        assert_eq!(sweep.values(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sweep.outputs().rows(), 5);
        assert!((sweep.relative_change()[0] - 400.0 / 3.0).abs() < 1e-9);
        assert_eq!(sweep.relative_change()[1], 0.0);
        assert_eq!(sweep.label(), "x [kg]");
        assert!(sweep.diagnostics().is_empty());
    }

    #[test]
    fn test_baseline_snapshot_is_shared() {
        let reg = registry();
        let sweeper_impacts = impacts();
        let model = model();
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &sweeper_impacts,
            OatConfig::default(),
        );
        assert_eq!(sweeper.baseline().get("x"), Some(3.0));
        assert_eq!(sweeper.baseline().get("z"), Some(4.0));

        let sweep = sweeper.sweep("y").unwrap();
        // x stays at its captured default while y moves
        assert!(sweep.outputs().column(0).unwrap().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_oat_matrix_covers_variable_model_parameters() {
        let reg = registry();
        let impacts = impacts();
        let compiled = model().compile(&impacts).unwrap();
        let sweeper = OatSweeper::new(&reg, &compiled, &impacts, OatConfig::default());

        let matrix = sweeper.oat_matrix().unwrap();
        assert_eq!(matrix.parameters(), &["x".to_string(), "y".to_string()]);
        assert_eq!(matrix.labels(), &["x [kg]".to_string(), "y".to_string()]);
        assert_eq!(matrix.values().dim(), (2, 2));
        assert_eq!(matrix.get("y", "gwp"), Some(0.0));
        assert!(matrix.get("x", "gwp").unwrap() > 0.0);
    }

    #[test]
    fn test_zero_median_reports_infinity() {
        let reg = ParamRegistry::from_params(vec![ParamDef::linear("x", 0.0, -1.0, 1.0)]).unwrap();
        let impacts = impacts();
        let model = FnModel::new(["x"])
            .with_impact("gwp", |p| p[0])
            .with_impact("water", |_| 0.0);
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig { steps: 3 },
        );

        let sweep = sweeper.sweep("x").unwrap();
        assert_eq!(sweep.relative_change()[0], f64::INFINITY);
        assert_eq!(sweep.relative_change()[1], 0.0);
        assert_eq!(sweep.diagnostics().len(), 1);
        assert!(matches!(
            &sweep.diagnostics()[0],
            Diagnostic::ZeroDenominator { metric: RatioMetric::RelativeChange, .. }
        ));
    }

    #[test]
    fn test_non_finite_outputs_reported_as_zero_change() {
        let reg = ParamRegistry::from_params(vec![ParamDef::linear("x", 1.0, 1.0, 2.0)]).unwrap();
        let impacts = impacts();
        let model = FnModel::new(["x"])
            .with_impact("gwp", |p| p[0])
            .with_impact("water", |p| if p[0] > 1.5 { f64::NAN } else { p[0] });
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig { steps: 5 },
        );

        let sweep = sweeper.sweep("x").unwrap();
        assert!(sweep.relative_change()[0] > 0.0);
        assert_eq!(sweep.relative_change()[1], 0.0);
        assert_eq!(
            sweep.diagnostics(),
            &[Diagnostic::NonFiniteOutput {
                impact: "water".into(),
                parameter: Some("x".into()),
                count: 2,
            }]
        );
    }

    #[test]
    fn test_division_by_zero_output_reported_as_zero_change() {
        let reg = ParamRegistry::from_params(vec![ParamDef::linear("x", 0.0, -1.0, 1.0)]).unwrap();
        let impacts = impacts();
        let model = FnModel::new(["x"])
            .with_impact("gwp", |p| 1.0 / p[0])
            .with_impact("water", |p| 2.0 + p[0]);
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig { steps: 3 },
        );

        let matrix = sweeper.oat_matrix().unwrap();
        assert_eq!(matrix.get("x", "gwp"), Some(0.0));
        assert_eq!(matrix.get("x", "water"), Some(100.0));
        assert_eq!(matrix.diagnostics().len(), 1);
        assert!(matches!(
            &matrix.diagnostics()[0],
            Diagnostic::NonFiniteOutput { impact, count: 1, .. } if impact == "gwp"
        ));
    }

    #[test]
    fn test_unknown_parameter_and_zero_steps() {
        let reg = registry();
        let impacts = impacts();
        let model = model();
        let sweeper = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig::default(),
        );
        assert!(matches!(
            sweeper.sweep("nope"),
            Err(SensitivityError::UnknownParameter(_))
        ));

        let empty = OatSweeper::new(
            &reg,
            Evaluator::RawModel(&model),
            &impacts,
            OatConfig { steps: 0 },
        );
        assert!(empty.sweep("x").is_err());
    }
}

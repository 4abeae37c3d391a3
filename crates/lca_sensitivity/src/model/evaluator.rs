//! Model evaluation seam.
//!
//! A raw model knows how to compile itself into one closure per impact; a
//! compiled model evaluates those closures over a parameter assignment.
//! Compiling once and evaluating many times is what keeps large sample
//! designs affordable.

use std::fmt;
use std::sync::Arc;

use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::{ImpactDef, ImpactTable};
use crate::error::ModelError;

/// Value bound to a parameter: a scalar broadcast to every row, or one value per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl ParamValue {
    /// Row count implied by this value, `None` for scalars
    pub fn len(&self) -> Option<usize> {
        match self {
            ParamValue::Scalar(_) => None,
            ParamValue::Vector(v) => Some(v.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Value for `row`; scalars broadcast
    pub fn at(&self, row: usize) -> f64 {
        match self {
            ParamValue::Scalar(v) => *v,
            ParamValue::Vector(v) => v[row],
        }
    }
}

/// Mapping from parameter name to its value(s) for one evaluation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamAssignment {
    values: FxHashMap<String, ParamValue>,
}

impl ParamAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of rows the assignment describes.
    ///
    /// All vectors must share one length; an all-scalar assignment is one row.
    pub fn row_count(&self) -> Result<usize, ModelError> {
        let mut rows: Option<usize> = None;
        for (name, value) in &self.values {
            let Some(len) = value.len() else { continue };
            match rows {
                None => rows = Some(len),
                Some(expected) if expected != len => {
                    return Err(ModelError::LengthMismatch {
                        name: name.clone(),
                        len,
                        expected,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(rows.unwrap_or(1))
    }
}

/// Precompiled closure computing one impact from the model's parameters,
/// given in `CompiledModel::required_params` order.
pub type ImpactFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Raw model: compiles itself for a set of impacts.
pub trait ImpactModel: Send + Sync {
    /// Names of the parameters the model reads
    fn required_params(&self) -> Vec<String>;

    fn compile(&self, impacts: &[ImpactDef]) -> Result<CompiledModel, ModelError>;
}

/// A model reduced to one closure per impact.
#[derive(Clone)]
pub struct CompiledModel {
    params: Vec<String>,
    impacts: Vec<ImpactDef>,
    lambdas: Vec<ImpactFn>,
}

impl fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("params", &self.params)
            .field("impacts", &self.impacts)
            .finish_non_exhaustive()
    }
}

impl CompiledModel {
    pub fn new(
        params: Vec<String>,
        impacts: Vec<ImpactDef>,
        lambdas: Vec<ImpactFn>,
    ) -> Result<Self, ModelError> {
        if impacts.len() != lambdas.len() {
            return Err(ModelError::LengthMismatch {
                name: "impacts".to_string(),
                len: lambdas.len(),
                expected: impacts.len(),
            });
        }
        Ok(Self {
            params,
            impacts,
            lambdas,
        })
    }

    pub fn required_params(&self) -> &[String] {
        &self.params
    }

    pub fn impacts(&self) -> &[ImpactDef] {
        &self.impacts
    }

    /// Evaluate every row of `assignment`, preserving row order.
    pub fn evaluate(
        &self,
        assignment: &ParamAssignment,
        impacts: &[ImpactDef],
    ) -> Result<ImpactTable, ModelError> {
        if impacts != self.impacts.as_slice() {
            return Err(ModelError::ImpactMismatch {
                compiled: self.impacts.iter().map(|i| i.id.clone()).collect(),
                requested: impacts.iter().map(|i| i.id.clone()).collect(),
            });
        }

        let columns = self
            .params
            .iter()
            .map(|name| {
                assignment
                    .get(name)
                    .ok_or_else(|| ModelError::MissingParameter(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let n_rows = assignment.row_count()?;

        let eval_row = |row: usize| -> Vec<f64> {
            let values: Vec<f64> = columns.iter().map(|c| c.at(row)).collect();
            self.lambdas.iter().map(|f| f(&values)).collect()
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f64>> = (0..n_rows).into_par_iter().map(eval_row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f64>> = (0..n_rows).map(eval_row).collect();

        let mut values = Array2::zeros((n_rows, self.lambdas.len()));
        for (mut target, row) in values.rows_mut().into_iter().zip(&rows) {
            for (slot, value) in target.iter_mut().zip(row) {
                *slot = *value;
            }
        }

        Ok(ImpactTable::from_parts(impacts.to_vec(), values))
    }
}

/// Raw model assembled from closures, one per known impact.
#[derive(Clone, Default)]
pub struct FnModel {
    params: Vec<String>,
    lambdas: FxHashMap<String, ImpactFn>,
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("params", &self.params)
            .field("impacts", &self.lambdas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FnModel {
    pub fn new<S: Into<String>>(params: impl IntoIterator<Item = S>) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            lambdas: FxHashMap::default(),
        }
    }

    /// Register the closure computing impact `impact_id`
    #[must_use]
    pub fn with_impact(
        mut self,
        impact_id: impl Into<String>,
        f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.lambdas.insert(impact_id.into(), Arc::new(f));
        self
    }
}

impl ImpactModel for FnModel {
    fn required_params(&self) -> Vec<String> {
        self.params.clone()
    }

    fn compile(&self, impacts: &[ImpactDef]) -> Result<CompiledModel, ModelError> {
        let lambdas = impacts
            .iter()
            .map(|impact| {
                self.lambdas
                    .get(&impact.id)
                    .cloned()
                    .ok_or_else(|| ModelError::ImpactMismatch {
                        compiled: self.lambdas.keys().cloned().collect(),
                        requested: impacts.iter().map(|i| i.id.clone()).collect(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        CompiledModel::new(self.params.clone(), impacts.to_vec(), lambdas)
    }
}

/// Either a raw model (compiled on every call) or a precompiled one.
#[derive(Clone, Copy)]
pub enum Evaluator<'a> {
    RawModel(&'a dyn ImpactModel),
    CompiledModel(&'a CompiledModel),
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluator::RawModel(_) => f.write_str("Evaluator::RawModel"),
            Evaluator::CompiledModel(m) => write!(f, "Evaluator::CompiledModel({m:?})"),
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn evaluate(
        &self,
        assignment: &ParamAssignment,
        impacts: &[ImpactDef],
    ) -> Result<ImpactTable, ModelError> {
        match self {
            Evaluator::RawModel(model) => model.compile(impacts)?.evaluate(assignment, impacts),
            Evaluator::CompiledModel(compiled) => compiled.evaluate(assignment, impacts),
        }
    }

    pub fn required_params(&self) -> Vec<String> {
        match self {
            Evaluator::RawModel(model) => model.required_params(),
            Evaluator::CompiledModel(compiled) => compiled.required_params().to_vec(),
        }
    }
}

impl<'a> From<&'a CompiledModel> for Evaluator<'a> {
    fn from(model: &'a CompiledModel) -> Self {
        Evaluator::CompiledModel(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impacts() -> Vec<ImpactDef> {
        vec![
            ImpactDef::new("gwp", "Climate change", "kg CO2-eq"),
            ImpactDef::new("water", "Water use", "m3"),
        ]
    }

    fn model() -> FnModel {
        FnModel::new(["a", "b"])
            .with_impact("gwp", |p| p[0] * p[1])
            .with_impact("water", |p| p[0] + p[1])
    }

    #[test]
    fn test_scalar_broadcast_against_vector() {
        let mut assignment = ParamAssignment::new();
        assignment.insert("a", ParamValue::Vector(vec![1.0, 2.0, 3.0]));
        assignment.insert("b", ParamValue::Scalar(10.0));

        let compiled = model().compile(&impacts()).unwrap();
        let table = compiled.evaluate(&assignment, &impacts()).unwrap();

        assert_eq!(table.rows(), 3);
        assert_eq!(table.column(0).unwrap().to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(
            table.column_by_id("water").unwrap().to_vec(),
            vec![11.0, 12.0, 13.0]
        );
        assert!(table.column(2).is_none());
    }

    #[test]
    fn test_raw_and_compiled_agree() {
        let mut assignment = ParamAssignment::new();
        assignment.insert("a", ParamValue::Vector(vec![0.5, 1.5]));
        assignment.insert("b", ParamValue::Vector(vec![2.0, 4.0]));
        assignment.insert("unused", ParamValue::Scalar(7.0));

        let raw = model();
        let compiled = raw.compile(&impacts()).unwrap();

        let from_raw = Evaluator::RawModel(&raw)
            .evaluate(&assignment, &impacts())
            .unwrap();
        let from_compiled = Evaluator::from(&compiled)
            .evaluate(&assignment, &impacts())
            .unwrap();
        assert_eq!(from_raw, from_compiled);
    }

    #[test]
    fn test_all_scalar_assignment_is_one_row() {
        let mut assignment = ParamAssignment::new();
        assignment.insert("a", ParamValue::Scalar(2.0));
        assignment.insert("b", ParamValue::Scalar(3.0));
        let table = Evaluator::RawModel(&model())
            .evaluate(&assignment, &impacts())
            .unwrap();
        assert_eq!(table.rows(), 1);
        assert_eq!(table.values().row(0).as_slice(), Some(&[6.0, 5.0][..]));
    }

    #[test]
    fn test_missing_parameter_and_length_mismatch() {
        let mut assignment = ParamAssignment::new();
        assignment.insert("a", ParamValue::Scalar(2.0));
        let err = Evaluator::RawModel(&model())
            .evaluate(&assignment, &impacts())
            .unwrap_err();
        assert_eq!(err, ModelError::MissingParameter("b".to_string()));

        assignment.insert("a", ParamValue::Vector(vec![1.0, 2.0]));
        assignment.insert("b", ParamValue::Vector(vec![1.0, 2.0, 3.0]));
        let err = Evaluator::RawModel(&model())
            .evaluate(&assignment, &impacts())
            .unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { .. }));
    }

    #[test]
    fn test_compiled_rejects_other_impacts() {
        let compiled = model().compile(&impacts()[..1]).unwrap();
        let mut assignment = ParamAssignment::new();
        assignment.insert("a", ParamValue::Scalar(1.0));
        assignment.insert("b", ParamValue::Scalar(1.0));
        let err = compiled.evaluate(&assignment, &impacts()).unwrap_err();
        assert!(matches!(err, ModelError::ImpactMismatch { .. }));

        let unknown = [ImpactDef::new("ozone", "Ozone depletion", "kg CFC-11-eq")];
        assert!(model().compile(&unknown).is_err());
    }
}

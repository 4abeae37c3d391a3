use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};

/// An impact category the model computes (one output column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImpactDef {
    pub id: String,
    pub name: String,
    pub unit: String,
}

impl ImpactDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
        }
    }

    /// Display label including the unit
    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.unit)
    }
}

/// Output matrix: one row per evaluated sample, one column per impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactTable {
    impacts: Vec<ImpactDef>,
    #[serde(with = "crate::float_serde::matrix")]
    values: Array2<f64>,
}

impl ImpactTable {
    pub fn new(impacts: Vec<ImpactDef>, values: Array2<f64>) -> Result<Self> {
        if values.ncols() != impacts.len() {
            return Err(SensitivityError::invalid(format!(
                "output has {} columns for {} impacts",
                values.ncols(),
                impacts.len()
            )));
        }
        Ok(Self { impacts, values })
    }

    pub(crate) fn from_parts(impacts: Vec<ImpactDef>, values: Array2<f64>) -> Self {
        Self { impacts, values }
    }

    pub fn impacts(&self) -> &[ImpactDef] {
        &self.impacts
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, impact: usize) -> Option<ArrayView1<'_, f64>> {
        (impact < self.values.ncols()).then(|| self.values.column(impact))
    }

    /// Impact definitions paired with their output columns
    pub fn columns(&self) -> impl Iterator<Item = (&ImpactDef, ArrayView1<'_, f64>)> {
        self.impacts.iter().zip(self.values.axis_iter(Axis(1)))
    }

    pub fn column_by_id(&self, id: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.impacts.iter().position(|i| i.id == id)?;
        self.column(idx)
    }

    pub fn impact_names(&self) -> Vec<String> {
        self.impacts.iter().map(|i| i.name.clone()).collect()
    }
}

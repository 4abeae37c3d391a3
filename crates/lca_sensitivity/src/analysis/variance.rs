//! Variance decomposition and the relative-deviation view of Sobol indices.

use ndarray::{Array2, aview1, s};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::{Diagnostic, RatioMetric, ReportTable};
use crate::error::{Result, SensitivityError};
use crate::model::{ImpactDef, ImpactTable};
use crate::stats;

/// Row label of the interaction term in contribution tables
pub const HIGHER_ORDER_LABEL: &str = "Higher order";

/// How the importance matrix expresses total-order indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceMode {
    /// Raw ST, the share of variance
    #[default]
    Sobol,
    /// `sqrt(ST * Var) / Mean * 100`, deviation relative to the mean
    Percent,
}

/// Relative variance of each impact split into per-parameter shares.
///
/// For every impact `sum(contributions[.., impact]) + residual[impact]`
/// equals `relative_variance_pct[impact]`. An impact with NaN or infinite
/// outputs reports zero everywhere and a [`Diagnostic::NonFiniteOutput`].
#[derive(Debug, Clone, Serialize)]
pub struct VarianceDecomposition {
    names: Vec<String>,
    impacts: Vec<ImpactDef>,
    #[serde(with = "crate::float_serde::vec")]
    mean: Vec<f64>,
    #[serde(with = "crate::float_serde::vec")]
    std: Vec<f64>,
    #[serde(with = "crate::float_serde::vec")]
    relative_variance_pct: Vec<f64>,
    #[serde(with = "crate::float_serde::matrix")]
    contributions: Array2<f64>,
    #[serde(with = "crate::float_serde::vec")]
    residual: Vec<f64>,
    #[serde(with = "crate::float_serde::matrix")]
    s1: Array2<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl VarianceDecomposition {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn impacts(&self) -> &[ImpactDef] {
        &self.impacts
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// `Var / Mean^2 * 100` per impact
    pub fn relative_variance_pct(&self) -> &[f64] {
        &self.relative_variance_pct
    }

    /// `S1 * relative_variance_pct`, parameters x impacts
    pub fn contributions(&self) -> &Array2<f64> {
        &self.contributions
    }

    /// Variance left to interactions, not clamped
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    pub fn s1(&self) -> &Array2<f64> {
        &self.s1
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `mean`, `std` and one `s1(name)` row per parameter, impacts as columns.
    pub fn summary_table(&self) -> ReportTable {
        let mut values = Array2::zeros((self.names.len() + 2, self.impacts.len()));
        values.row_mut(0).assign(&aview1(&self.mean));
        values.row_mut(1).assign(&aview1(&self.std));
        values.slice_mut(s![2.., ..]).assign(&self.s1);
        let mut labels = vec!["mean".to_string(), "std".to_string()];
        labels.extend(self.names.iter().map(|n| format!("s1({n})")));
        ReportTable::new(
            "Impact variations",
            labels,
            impact_labels(&self.impacts),
            values,
        )
    }

    /// Stacked contributions: one row per parameter then the higher-order residual.
    pub fn contribution_table(&self) -> ReportTable {
        let k = self.names.len();
        let mut values = Array2::zeros((k + 1, self.impacts.len()));
        values.slice_mut(s![..k, ..]).assign(&self.contributions);
        values.row_mut(k).assign(&aview1(&self.residual));
        let mut labels = self.names.clone();
        labels.push(HIGHER_ORDER_LABEL.to_string());
        ReportTable::new(
            "variance / mean² (%)",
            labels,
            impact_labels(&self.impacts),
            values,
        )
    }
}

pub(crate) fn impact_labels(impacts: &[ImpactDef]) -> Vec<String> {
    impacts.iter().map(|i| i.name.clone()).collect()
}

fn check_shape(outputs: &ImpactTable, names: &[String], indices: &Array2<f64>) -> Result<()> {
    let expected = (names.len(), outputs.impacts().len());
    if indices.dim() != expected {
        return Err(SensitivityError::invalid(format!(
            "index matrix is {:?}, expected {:?} (parameters x impacts)",
            indices.dim(),
            expected
        )));
    }
    if outputs.rows() == 0 {
        return Err(SensitivityError::invalid("output table is empty"));
    }
    Ok(())
}

/// Split each impact's relative variance across parameters using S1.
pub fn decompose(
    outputs: &ImpactTable,
    names: &[String],
    s1: &Array2<f64>,
) -> Result<VarianceDecomposition> {
    check_shape(outputs, names, s1)?;

    let m = outputs.impacts().len();
    let mut mean = Vec::with_capacity(m);
    let mut std = Vec::with_capacity(m);
    let mut relative_variance_pct = Vec::with_capacity(m);
    let mut residual = Vec::with_capacity(m);
    let mut contributions = Array2::zeros((names.len(), m));
    let mut diagnostics = Vec::new();

    for (c, (impact, column)) in outputs.columns().enumerate() {
        let non_finite = stats::non_finite_count(column);
        if non_finite > 0 {
            diagnostics.push(Diagnostic::non_finite_output(&impact.id, None, non_finite));
            mean.push(0.0);
            std.push(0.0);
            relative_variance_pct.push(0.0);
            residual.push(0.0);
            continue;
        }

        let mu = column.iter().mean();
        let var = column.iter().population_variance();
        let ratio = stats::guarded_ratio(var, mu * mu);
        let rv = ratio.value * 100.0;
        if ratio.zero_denominator && var != 0.0 {
            diagnostics.push(Diagnostic::zero_denominator(
                &impact.id,
                None,
                RatioMetric::RelativeVariance,
            ));
        }

        let mut explained = 0.0;
        if rv.is_finite() {
            for (share, index) in contributions.column_mut(c).iter_mut().zip(s1.column(c)) {
                *share = index * rv;
                explained += *share;
            }
        }

        mean.push(mu);
        std.push(var.sqrt());
        relative_variance_pct.push(rv);
        residual.push(rv - explained);
    }

    Ok(VarianceDecomposition {
        names: names.to_vec(),
        impacts: outputs.impacts().to_vec(),
        mean,
        std,
        relative_variance_pct,
        contributions,
        residual,
        s1: s1.clone(),
        diagnostics,
    })
}

/// Parameter importance, parameters as rows and impacts as columns.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationMatrix {
    pub mode: ImportanceMode,
    pub table: ReportTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Express total-order indices in `mode`.
///
/// In percent mode a negative `ST * Var` (estimator noise) is clamped to zero
/// before the square root, and an impact with non-finite outputs gets a zero
/// column.
pub fn deviation_matrix(
    outputs: &ImpactTable,
    names: &[String],
    st: &Array2<f64>,
    mode: ImportanceMode,
) -> Result<DeviationMatrix> {
    check_shape(outputs, names, st)?;

    let mut data = st.clone();
    let mut diagnostics = Vec::new();
    if mode == ImportanceMode::Percent {
        for (c, (impact, column)) in outputs.columns().enumerate() {
            let non_finite = stats::non_finite_count(column);
            if non_finite > 0 {
                diagnostics.push(Diagnostic::non_finite_output(&impact.id, None, non_finite));
                data.column_mut(c).fill(0.0);
                continue;
            }

            let mu = column.iter().mean();
            let var = column.iter().population_variance();
            for (r, name) in names.iter().enumerate() {
                let explained = (st[[r, c]] * var).max(0.0);
                let ratio = stats::guarded_ratio(explained.sqrt(), mu);
                if ratio.zero_denominator && explained != 0.0 {
                    diagnostics.push(Diagnostic::zero_denominator(
                        &impact.id,
                        Some(name.as_str()),
                        RatioMetric::PercentDeviation,
                    ));
                }
                data[[r, c]] = ratio.value * 100.0;
            }
        }
    }

    let title = match mode {
        ImportanceMode::Sobol => "Sobol indices (part of variability)",
        ImportanceMode::Percent => "Relative deviation of impacts (%)",
    };
    Ok(DeviationMatrix {
        mode,
        table: ReportTable::new(title, names.to_vec(), impact_labels(outputs.impacts()), data),
        diagnostics,
    })
}

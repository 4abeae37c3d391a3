//! Sobol index estimation from a Saltelli design.
//!
//! Each output column is standardized and split back into its radial groups.
//! First-order indices use the Saltelli (2010) estimator and total-order
//! indices the Jansen estimator:
//!
//! ```text
//! S1_j = mean(B * (AB_j - A)) / Var([A; B])
//! ST_j = mean((A - AB_j)^2) / 2 / Var([A; B])
//! ```
//!
//! Estimation runs impact by impact. A failing impact gets zero columns and a
//! [`Diagnostic`]; the others are unaffected.

use ndarray::{Array2, ArrayView1, Axis, aview1};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

use super::{Diagnostic, SobolConfig};
use crate::error::{EstimationFailure, Result, SensitivityError};
use crate::model::{ImpactDef, ImpactTable};
use crate::sampling::Problem;
use crate::stats;

/// Relative variance below which an output column counts as constant
const VARIANCE_TOLERANCE: f64 = 1e-20;

/// Indices of every parameter for one impact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactIndices {
    pub s1: Vec<f64>,
    pub st: Vec<f64>,
    /// Bootstrap half-widths, zero when resampling is disabled
    pub s1_conf: Vec<f64>,
    pub st_conf: Vec<f64>,
    /// Second-order indices, upper triangle of a `k x k` matrix
    #[serde(serialize_with = "crate::float_serde::option_matrix::serialize")]
    pub s2: Option<Array2<f64>>,
}

/// Column layout of a standardized output split by row role.
struct RadialGroups {
    a: Vec<f64>,
    b: Vec<f64>,
    ab: Vec<Vec<f64>>,
    ba: Vec<Vec<f64>>,
}

impl RadialGroups {
    fn split(y: &[f64], k: usize, second_order: bool) -> Self {
        let group = if second_order { 2 * k + 2 } else { k + 2 };
        let n = y.len() / group;
        let mut groups = Self {
            a: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
            ab: vec![Vec::with_capacity(n); k],
            ba: if second_order {
                vec![Vec::with_capacity(n); k]
            } else {
                Vec::new()
            },
        };
        for rows in y.chunks_exact(group) {
            groups.a.push(rows[0]);
            for j in 0..k {
                groups.ab[j].push(rows[1 + j]);
            }
            for (j, ba) in groups.ba.iter_mut().enumerate() {
                ba.push(rows[1 + k + j]);
            }
            groups.b.push(rows[group - 1]);
        }
        groups
    }

    fn variance(&self, rows: &[usize]) -> f64 {
        let values: Vec<f64> = rows
            .iter()
            .map(|&r| self.a[r])
            .chain(rows.iter().map(|&r| self.b[r]))
            .collect();
        values.population_variance()
    }

    fn first_order(&self, j: usize, rows: &[usize], var: f64) -> f64 {
        let ab = &self.ab[j];
        let sum: f64 = rows
            .iter()
            .map(|&r| self.b[r] * (ab[r] - self.a[r]))
            .sum();
        sum / rows.len() as f64 / var
    }

    fn total_order(&self, j: usize, rows: &[usize], var: f64) -> f64 {
        let ab = &self.ab[j];
        let sum: f64 = rows
            .iter()
            .map(|&r| (self.a[r] - ab[r]).powi(2))
            .sum();
        0.5 * sum / rows.len() as f64 / var
    }

    fn second_order(&self, j: usize, l: usize, rows: &[usize], var: f64, s1: &[f64]) -> f64 {
        let ba = &self.ba[j];
        let ab = &self.ab[l];
        let sum: f64 = rows
            .iter()
            .map(|&r| ba[r] * ab[r] - self.a[r] * self.b[r])
            .sum();
        sum / rows.len() as f64 / var - s1[j] - s1[l]
    }
}

/// Settings derived once per analysis and shared by every impact.
struct Estimation<'a> {
    names: &'a [String],
    second_order: bool,
    resamples: Vec<Vec<usize>>,
    z: f64,
}

impl Estimation<'_> {
    fn estimate(
        &self,
        y: ArrayView1<'_, f64>,
    ) -> std::result::Result<ImpactIndices, EstimationFailure> {
        let non_finite = stats::non_finite_count(y);
        if non_finite > 0 {
            return Err(EstimationFailure::NonFiniteOutput { count: non_finite });
        }

        let mean = y.iter().mean();
        let variance = y.iter().population_variance();
        if variance == 0.0 || variance <= VARIANCE_TOLERANCE * mean * mean {
            return Err(EstimationFailure::ZeroVariance { variance });
        }
        let std = variance.sqrt();
        let z: Vec<f64> = y.iter().map(|v| (v - mean) / std).collect();

        let k = self.names.len();
        let groups = RadialGroups::split(&z, k, self.second_order);
        let all: Vec<usize> = (0..groups.a.len()).collect();
        let var = groups.variance(&all);
        if var == 0.0 {
            return Err(EstimationFailure::ZeroVariance { variance: var });
        }

        let s1: Vec<f64> = (0..k).map(|j| groups.first_order(j, &all, var)).collect();
        let st: Vec<f64> = (0..k).map(|j| groups.total_order(j, &all, var)).collect();
        let (s1_conf, st_conf) = self.confidence(&groups, k);

        let s2 = self.second_order.then(|| {
            let mut s2 = Array2::zeros((k, k));
            for j in 0..k {
                for l in (j + 1)..k {
                    s2[[j, l]] = groups.second_order(j, l, &all, var, &s1);
                }
            }
            s2
        });

        for (j, name) in self.names.iter().enumerate() {
            let row_finite = [s1[j], st[j], s1_conf[j], st_conf[j]]
                .iter()
                .all(|v| v.is_finite())
                && s2
                    .as_ref()
                    .is_none_or(|m| m.row(j).iter().all(|v| v.is_finite()));
            if !row_finite {
                return Err(EstimationFailure::NonFiniteIndex {
                    parameter: name.clone(),
                });
            }
        }

        Ok(ImpactIndices {
            s1,
            st,
            s1_conf,
            st_conf,
            s2,
        })
    }

    /// Bootstrap half-widths `z * std(resampled estimates)`.
    fn confidence(&self, groups: &RadialGroups, k: usize) -> (Vec<f64>, Vec<f64>) {
        let mut s1_samples = vec![Vec::with_capacity(self.resamples.len()); k];
        let mut st_samples = vec![Vec::with_capacity(self.resamples.len()); k];
        for rows in &self.resamples {
            let var = groups.variance(rows);
            if var == 0.0 {
                continue;
            }
            for j in 0..k {
                s1_samples[j].push(groups.first_order(j, rows, var));
                st_samples[j].push(groups.total_order(j, rows, var));
            }
        }
        let half_width = |samples: &Vec<f64>| {
            if samples.len() < 2 {
                0.0
            } else {
                self.z * samples.std_dev()
            }
        };
        (
            s1_samples.iter().map(half_width).collect(),
            st_samples.iter().map(half_width).collect(),
        )
    }
}

/// First, total and second-order indices of every (parameter, impact) pair.
///
/// Matrices are `k x impacts` with rows in problem order. Never NaN: an impact
/// whose estimation failed has zero columns and an entry in `diagnostics`.
#[derive(Debug, Clone, Serialize)]
pub struct SensitivityIndices {
    names: Vec<String>,
    impacts: Vec<ImpactDef>,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    s1: Array2<f64>,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    st: Array2<f64>,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    s1_conf: Array2<f64>,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    st_conf: Array2<f64>,
    #[serde(serialize_with = "crate::float_serde::option_matrices::serialize")]
    s2: Vec<Option<Array2<f64>>>,
    failures: Vec<Option<EstimationFailure>>,
    diagnostics: Vec<Diagnostic>,
}

impl SensitivityIndices {
    fn from_results(
        names: &[String],
        impacts: &[ImpactDef],
        results: Vec<std::result::Result<ImpactIndices, EstimationFailure>>,
    ) -> Self {
        let k = names.len();
        let m = impacts.len();
        let mut indices = Self {
            names: names.to_vec(),
            impacts: impacts.to_vec(),
            s1: Array2::zeros((k, m)),
            st: Array2::zeros((k, m)),
            s1_conf: Array2::zeros((k, m)),
            st_conf: Array2::zeros((k, m)),
            s2: Vec::with_capacity(m),
            failures: Vec::with_capacity(m),
            diagnostics: Vec::new(),
        };

        for (c, (impact, result)) in impacts.iter().zip(results).enumerate() {
            match result {
                Ok(found) => {
                    indices.s1.column_mut(c).assign(&aview1(&found.s1));
                    indices.st.column_mut(c).assign(&aview1(&found.st));
                    indices.s1_conf.column_mut(c).assign(&aview1(&found.s1_conf));
                    indices.st_conf.column_mut(c).assign(&aview1(&found.st_conf));
                    indices.s2.push(found.s2);
                    indices.failures.push(None);
                }
                Err(failure) => {
                    tracing::warn!(
                        impact = %impact.id,
                        error = %failure,
                        "Sobol estimation failed, reporting zero indices"
                    );
                    indices.s2.push(None);
                    indices.diagnostics.push(Diagnostic::EstimationFailed {
                        impact: impact.id.clone(),
                        failure: failure.clone(),
                    });
                    indices.failures.push(Some(failure));
                }
            }
        }
        indices
    }

    /// Parameter names labelling the rows
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn impacts(&self) -> &[ImpactDef] {
        &self.impacts
    }

    pub fn s1(&self) -> &Array2<f64> {
        &self.s1
    }

    pub fn st(&self) -> &Array2<f64> {
        &self.st
    }

    pub fn s1_conf(&self) -> &Array2<f64> {
        &self.s1_conf
    }

    pub fn st_conf(&self) -> &Array2<f64> {
        &self.st_conf
    }

    /// Second-order matrix of impact column `impact`, if the design had one
    pub fn s2(&self, impact: usize) -> Option<&Array2<f64>> {
        self.s2.get(impact).and_then(Option::as_ref)
    }

    pub fn failure(&self, impact: usize) -> Option<&EstimationFailure> {
        self.failures.get(impact).and_then(Option::as_ref)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Per-impact view in the same shape the estimator produced it
    pub fn impact(
        &self,
        impact: usize,
    ) -> Option<std::result::Result<ImpactIndices, EstimationFailure>> {
        if let Some(failure) = self.failures.get(impact)?.clone() {
            return Some(Err(failure));
        }
        Some(Ok(ImpactIndices {
            s1: self.s1.column(impact).to_vec(),
            st: self.st.column(impact).to_vec(),
            s1_conf: self.s1_conf.column(impact).to_vec(),
            st_conf: self.st_conf.column(impact).to_vec(),
            s2: self.s2.get(impact).cloned().flatten(),
        }))
    }
}

/// Estimate Sobol indices for every impact of `outputs`.
///
/// `outputs` must come from evaluating a design sampled for `problem` with
/// the same `calc_second_order` setting, rows in design order.
pub fn analyze(
    problem: &Problem,
    outputs: &ImpactTable,
    config: &SobolConfig,
) -> Result<SensitivityIndices> {
    let k = problem.len();
    let group = config.group_size(k);
    let rows = outputs.rows();
    if rows == 0 || rows % group != 0 {
        return Err(SensitivityError::invalid(format!(
            "{rows} output rows do not form whole groups of {group} for {k} parameters"
        )));
    }
    if !(config.conf_level > 0.0 && config.conf_level < 1.0) {
        return Err(SensitivityError::invalid(format!(
            "confidence level {} is outside (0, 1)",
            config.conf_level
        )));
    }
    let n = rows / group;

    tracing::info!(
        parameters = k,
        impacts = outputs.impacts().len(),
        base_count = n,
        "Computing Sobol indices"
    );

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = SmallRng::seed_from_u64(seed);
    let resamples = (0..config.num_resamples)
        .map(|_| (0..n).map(|_| rng.random_range(0..n)).collect())
        .collect();
    let z = Normal::standard().inverse_cdf(0.5 + config.conf_level / 2.0);

    let estimation = Estimation {
        names: problem.names(),
        second_order: config.calc_second_order,
        resamples,
        z,
    };

    let results = outputs
        .values()
        .axis_iter(Axis(1))
        .map(|y| estimation.estimate(y))
        .collect();

    Ok(SensitivityIndices::from_results(
        problem.names(),
        outputs.impacts(),
        results,
    ))
}

//! Saltelli radial design over the unit hypercube.
//!
//! Each base point of a `2k`-dimensional sequence is split into two
//! independent halves `A` and `B`. The group of rows emitted per base point is
//!
//! ```text
//! A, AB_1 .. AB_k, [BA_1 .. BA_k,] B
//! ```
//!
//! where `AB_j` is `A` with column `j` taken from `B` and `BA_j` the converse.
//! The `BA_j` rows are only present in second-order designs.

use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::Serialize;

use super::sequence::{LowDiscrepancySequence, MAX_SOBOL_DIMENSION, RandomSequence, SobolSequence};
use crate::analysis::SobolConfig;
use crate::error::{Result, SensitivityError};

/// Ordered parameter names of one analysis.
///
/// The order is canonical: design columns and index rows follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    names: Vec<String>,
}

impl Problem {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SensitivityError::invalid("problem has no parameters"));
        }
        let mut seen = FxHashSet::default();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SensitivityError::invalid(format!(
                    "parameter `{name}` appears twice in the problem"
                )));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Unit-hypercube samples laid out in radial groups.
#[derive(Debug, Clone, Serialize)]
pub struct DesignMatrix {
    problem: Problem,
    #[serde(serialize_with = "crate::float_serde::matrix::serialize")]
    matrix: Array2<f64>,
    base_count: usize,
    second_order: bool,
}

impl DesignMatrix {
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn names(&self) -> &[String] {
        self.problem.names()
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn base_count(&self) -> usize {
        self.base_count
    }

    pub fn is_second_order(&self) -> bool {
        self.second_order
    }

    /// Rows emitted per base point
    pub fn group_size(&self) -> usize {
        group_size(self.problem.len(), self.second_order)
    }
}

pub(crate) fn group_size(k: usize, second_order: bool) -> usize {
    if second_order { 2 * k + 2 } else { k + 2 }
}

/// Generate a Saltelli design of `config.base_count` groups for `problem`.
///
/// Fails with `InvalidArgument` when the base count is zero.
pub fn sample(problem: &Problem, config: &SobolConfig) -> Result<DesignMatrix> {
    let n = config.base_count;
    if n == 0 {
        return Err(SensitivityError::invalid("base count must be positive"));
    }
    let k = problem.len();
    let dim = 2 * k;
    let group = group_size(k, config.calc_second_order);

    tracing::info!(
        parameters = k,
        base_count = n,
        rows = n * group,
        second_order = config.calc_second_order,
        "Generating Saltelli samples"
    );

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut sequence = base_sequence(dim, config.scramble, seed)?;
    sequence.skip(n.next_power_of_two());

    let mut data = Vec::with_capacity(n * group * k);
    for _ in 0..n {
        let point = sequence.next_point();
        let (a, b) = point.split_at(k);

        data.extend_from_slice(a);
        for j in 0..k {
            data.extend(a.iter().enumerate().map(|(c, &v)| if c == j { b[j] } else { v }));
        }
        if config.calc_second_order {
            for j in 0..k {
                data.extend(b.iter().enumerate().map(|(c, &v)| if c == j { a[j] } else { v }));
            }
        }
        data.extend_from_slice(b);
    }

    let matrix = Array2::from_shape_vec((n * group, k), data)
        .map_err(|e| SensitivityError::invalid(format!("design matrix shape mismatch: {e}")))?;

    Ok(DesignMatrix {
        problem: problem.clone(),
        matrix,
        base_count: n,
        second_order: config.calc_second_order,
    })
}

/// Scrambled or plain Sobol points, or pseudo-random ones past the Sobol table.
fn base_sequence(
    dim: usize,
    scramble: bool,
    seed: u64,
) -> Result<Box<dyn LowDiscrepancySequence>> {
    if dim > MAX_SOBOL_DIMENSION {
        tracing::warn!(
            dimension = dim,
            max = MAX_SOBOL_DIMENSION,
            "Design too wide for the Sobol sequence, falling back to pseudo-random samples"
        );
        return Ok(Box::new(RandomSequence::new(dim, seed)?));
    }
    if scramble {
        let mut rng = SmallRng::seed_from_u64(seed);
        Ok(Box::new(SobolSequence::scrambled(dim, &mut rng)?))
    } else {
        Ok(Box::new(SobolSequence::new(dim)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n: usize) -> SobolConfig {
        SobolConfig {
            base_count: n,
            seed: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_shape_and_range() {
        for (k, n) in [(1, 4), (3, 8), (5, 3)] {
            let problem = Problem::new((0..k).map(|i| format!("p{i}"))).unwrap();
            let design = sample(&problem, &config(n)).unwrap();
            assert_eq!(design.rows(), n * (2 * k + 2));
            assert_eq!(design.matrix().ncols(), k);
            assert!(design.matrix().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_radial_structure() {
        let problem = Problem::new(["a", "b", "c"]).unwrap();
        let design = sample(&problem, &config(4)).unwrap();
        let k = 3;
        let m = design.matrix();
        for g in 0..4 {
            let base = g * design.group_size();
            let a = m.row(base);
            let b = m.row(base + 2 * k + 1);
            for j in 0..k {
                let ab = m.row(base + 1 + j);
                let ba = m.row(base + 1 + k + j);
                for c in 0..k {
                    let (expect_ab, expect_ba) = if c == j { (b[c], a[c]) } else { (a[c], b[c]) };
                    assert_eq!(ab[c], expect_ab);
                    assert_eq!(ba[c], expect_ba);
                }
            }
        }
    }

    #[test]
    fn test_first_order_design_is_shorter() {
        let problem = Problem::new(["a", "b"]).unwrap();
        let cfg = SobolConfig {
            calc_second_order: false,
            ..config(6)
        };
        let design = sample(&problem, &cfg).unwrap();
        assert_eq!(design.rows(), 6 * 4);
        assert_eq!(design.group_size(), 4);
        assert!(!design.is_second_order());
        let b = design.matrix().row(3);
        let ab2 = design.matrix().row(2);
        assert_eq!(ab2[1], b[1]);
    }

    #[test]
    fn test_seed_reproduces_design() {
        let problem = Problem::new(["a", "b"]).unwrap();
        let first = sample(&problem, &config(8)).unwrap();
        let second = sample(&problem, &config(8)).unwrap();
        assert_eq!(first.matrix(), second.matrix());

        let other = sample(&problem, &config(8).with_seed(6)).unwrap();
        assert_ne!(first.matrix(), other.matrix());
    }

    #[test]
    fn test_wide_design_falls_back_to_random() {
        let dim = MAX_SOBOL_DIMENSION + 2;
        let mut sequence = base_sequence(dim, true, 3).unwrap();
        assert_eq!(sequence.dimension(), dim);
        assert!(sequence.next_point().iter().all(|v| (0.0..1.0).contains(v)));

        let mut sobol = base_sequence(4, false, 3).unwrap();
        assert_eq!(sobol.next_point(), &[0.0; 4]);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            Problem::new(Vec::<String>::new()),
            Err(SensitivityError::InvalidArgument(_))
        ));
        assert!(Problem::new(["a", "a"]).is_err());

        let problem = Problem::new(["a"]).unwrap();
        assert!(matches!(
            sample(&problem, &config(0)),
            Err(SensitivityError::InvalidArgument(_))
        ));
    }
}

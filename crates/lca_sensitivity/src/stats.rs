//! Ratios and summaries shared by the analyses.
//!
//! Descriptive statistics come from `statrs`: population variance for
//! relative variance, sample standard deviation for bootstrap spreads, and
//! order statistics for medians and quartiles. What lives here is the
//! zero-denominator policy every reported ratio goes through.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Number of NaN or infinite entries
pub fn non_finite_count(values: ArrayView1<'_, f64>) -> usize {
    values.iter().filter(|v| !v.is_finite()).count()
}

/// Result of a ratio computed under the zero-denominator policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardedRatio {
    pub value: f64,
    /// The denominator was exactly zero
    pub zero_denominator: bool,
}

/// Divide under the crate-wide zero-denominator policy.
///
/// A zero denominator yields `0.0` when the numerator is zero too (nothing
/// varies) and a signed infinity otherwise. The result is never NaN for
/// finite inputs.
pub fn guarded_ratio(numerator: f64, denominator: f64) -> GuardedRatio {
    if denominator != 0.0 {
        return GuardedRatio {
            value: numerator / denominator,
            zero_denominator: false,
        };
    }
    let value = if numerator == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(numerator)
    };
    GuardedRatio {
        value,
        zero_denominator: true,
    }
}

/// Relative change `(max - min) / median * 100` of one output column.
///
/// `values` must be finite and non-empty; callers screen columns with
/// [`non_finite_count`] first.
pub fn relative_change_pct(values: ArrayView1<'_, f64>) -> GuardedRatio {
    let spread = Statistics::max(values.iter()) - Statistics::min(values.iter());
    let median = Data::new(values.to_vec()).median();
    let ratio = guarded_ratio(spread, median);
    GuardedRatio {
        value: ratio.value * 100.0,
        ..ratio
    }
}

/// Distribution summary of one output column (the data behind a violin plot)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    /// Summary of the finite entries of `values`; all zero when there are none.
    pub fn from_values(values: ArrayView1<'_, f64>) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }
        let min = Statistics::min(finite.iter());
        let max = Statistics::max(finite.iter());
        let mean = finite.iter().mean();
        let std_dev = finite.iter().population_std_dev();
        let mut data = Data::new(finite);
        Self {
            min,
            q1: data.lower_quartile(),
            median: data.median(),
            q3: data.upper_quartile(),
            max,
            mean,
            std_dev,
        }
    }
}

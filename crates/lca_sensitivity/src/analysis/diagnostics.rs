use std::fmt;

use serde::Serialize;

use crate::error::EstimationFailure;

/// Ratio computed under the zero-denominator policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioMetric {
    /// `(max - min) / median` of an OAT sweep
    RelativeChange,
    /// `Var / Mean^2` of a stochastic run
    RelativeVariance,
    /// `sqrt(ST * Var) / Mean` of the importance view
    PercentDeviation,
}

impl fmt::Display for RatioMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RatioMetric::RelativeChange => "relative change",
            RatioMetric::RelativeVariance => "relative variance",
            RatioMetric::PercentDeviation => "percent deviation",
        };
        f.write_str(name)
    }
}

/// Non-fatal condition attached to an analysis result.
///
/// Results carrying diagnostics are complete: the affected entries hold the
/// documented markers (zeroed indices, infinite ratios) instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Sobol estimation failed; the impact's index columns are zero
    EstimationFailed {
        impact: String,
        failure: EstimationFailure,
    },
    /// A ratio had a zero denominator and a non-zero numerator
    ZeroDenominator {
        impact: String,
        parameter: Option<String>,
        metric: RatioMetric,
    },
    /// NaN or infinite model outputs; the derived entries are zero
    NonFiniteOutput {
        impact: String,
        parameter: Option<String>,
        count: usize,
    },
}

impl Diagnostic {
    pub fn impact(&self) -> &str {
        match self {
            Diagnostic::EstimationFailed { impact, .. } => impact,
            Diagnostic::ZeroDenominator { impact, .. } => impact,
            Diagnostic::NonFiniteOutput { impact, .. } => impact,
        }
    }

    pub(crate) fn zero_denominator(
        impact: &str,
        parameter: Option<&str>,
        metric: RatioMetric,
    ) -> Self {
        tracing::warn!(
            impact = impact,
            parameter = parameter,
            metric = %metric,
            "Zero denominator, reporting an infinite ratio"
        );
        Diagnostic::ZeroDenominator {
            impact: impact.to_string(),
            parameter: parameter.map(str::to_string),
            metric,
        }
    }

    pub(crate) fn non_finite_output(impact: &str, parameter: Option<&str>, count: usize) -> Self {
        tracing::warn!(
            impact = impact,
            parameter = parameter,
            count = count,
            "Non-finite model outputs, reporting zero"
        );
        Diagnostic::NonFiniteOutput {
            impact: impact.to_string(),
            parameter: parameter.map(str::to_string),
            count,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EstimationFailed { impact, failure } => {
                write!(f, "Sobol estimation failed for `{impact}`: {failure}")
            }
            Diagnostic::ZeroDenominator {
                impact,
                parameter: Some(parameter),
                metric,
            } => write!(f, "{metric} of `{impact}` over `{parameter}` has a zero denominator"),
            Diagnostic::ZeroDenominator {
                impact,
                parameter: None,
                metric,
            } => write!(f, "{metric} of `{impact}` has a zero denominator"),
            Diagnostic::NonFiniteOutput {
                impact,
                parameter: Some(parameter),
                count,
            } => write!(f, "{count} non-finite values of `{impact}` over `{parameter}`"),
            Diagnostic::NonFiniteOutput {
                impact,
                parameter: None,
                count,
            } => write!(f, "{count} non-finite values of `{impact}`"),
        }
    }
}

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::ParameterSource;
use crate::error::{Result, SensitivityError};

/// Distribution of a float parameter.
///
/// `Normal` and `LogNormal` are truncated to `[min, max]` so that `rand`
/// always stays inside a finite domain. The parameter default is the mode of
/// `Triangle`, the mean of `Normal` and the median of `LogNormal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distrib")]
pub enum FloatDistribution {
    /// Not sampled: always the default
    Fixed,
    /// Uniform over `[min, max]`
    Linear { min: f64, max: f64 },
    Triangle { min: f64, max: f64 },
    Normal { std: f64, min: f64, max: f64 },
    /// `std` is the standard deviation of the underlying normal (log space)
    LogNormal { std: f64, min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParamKind {
    Float(FloatDistribution),
    Enum {
        values: Vec<String>,
        /// Relative selection weights; uniform when absent
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
    Bool,
}

/// A model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub default: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: ParamKind,
}

impl ParamDef {
    fn float(name: impl Into<String>, default: f64, distribution: FloatDistribution) -> Self {
        Self {
            name: name.into(),
            default,
            unit: None,
            description: None,
            kind: ParamKind::Float(distribution),
        }
    }

    pub fn fixed(name: impl Into<String>, default: f64) -> Self {
        Self::float(name, default, FloatDistribution::Fixed)
    }

    pub fn linear(name: impl Into<String>, default: f64, min: f64, max: f64) -> Self {
        Self::float(name, default, FloatDistribution::Linear { min, max })
    }

    pub fn triangle(name: impl Into<String>, default: f64, min: f64, max: f64) -> Self {
        Self::float(name, default, FloatDistribution::Triangle { min, max })
    }

    pub fn normal(name: impl Into<String>, default: f64, std: f64, min: f64, max: f64) -> Self {
        Self::float(name, default, FloatDistribution::Normal { std, min, max })
    }

    pub fn lognormal(name: impl Into<String>, default: f64, std: f64, min: f64, max: f64) -> Self {
        Self::float(name, default, FloatDistribution::LogNormal { std, min, max })
    }

    /// Enumerated parameter; the default is given by label.
    ///
    /// An unknown default label yields a definition that fails validation.
    pub fn enumeration(name: impl Into<String>, values: &[&str], default: &str) -> Self {
        let default = values
            .iter()
            .position(|v| *v == default)
            .map_or(f64::NAN, |i| i as f64);
        Self {
            name: name.into(),
            default,
            unit: None,
            description: None,
            kind: ParamKind::Enum {
                values: values.iter().map(|v| v.to_string()).collect(),
                weights: None,
            },
        }
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            default: if default { 1.0 } else { 0.0 },
            unit: None,
            description: None,
            kind: ParamKind::Bool,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set enum selection weights (ignored for other kinds)
    #[must_use]
    pub fn with_weights(mut self, new_weights: Vec<f64>) -> Self {
        if let ParamKind::Enum { weights, .. } = &mut self.kind {
            *weights = Some(new_weights);
        }
        self
    }

    /// Label of an enum value index, if this is an enum parameter
    pub fn label(&self, value: f64) -> Option<&str> {
        match &self.kind {
            ParamKind::Enum { values, .. } if value >= 0.0 => {
                values.get(value as usize).map(String::as_str)
            }
            _ => None,
        }
    }

    /// True when `value` lies in the parameter's domain
    pub fn contains(&self, value: f64) -> bool {
        match &self.kind {
            ParamKind::Float(FloatDistribution::Fixed) => value == self.default,
            ParamKind::Float(
                FloatDistribution::Linear { min, max }
                | FloatDistribution::Triangle { min, max }
                | FloatDistribution::Normal { min, max, .. }
                | FloatDistribution::LogNormal { min, max, .. },
            ) => value >= *min && value <= *max,
            ParamKind::Enum { values, .. } => {
                value.fract() == 0.0 && value >= 0.0 && (value as usize) < values.len()
            }
            ParamKind::Bool => value == 0.0 || value == 1.0,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SensitivityError {
        SensitivityError::InvalidParameter {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn cumulative_weights(values: &[String], weights: Option<&Vec<f64>>) -> Vec<f64> {
        let raw: Vec<f64> = match weights {
            Some(w) if w.len() == values.len() => w.clone(),
            _ => vec![1.0; values.len()],
        };
        let total: f64 = raw.iter().sum();
        let mut acc = 0.0;
        raw.iter()
            .map(|w| {
                acc += w / total;
                acc
            })
            .collect()
    }
}

/// Inverse CDF of a normal truncated to `[lo, hi]`, in standardized units
fn truncated_standard_normal(u: f64, lo: f64, hi: f64) -> f64 {
    let std_normal = Normal::standard();
    let a = std_normal.cdf(lo);
    let b = std_normal.cdf(hi);
    let p = (a + u * (b - a)).clamp(0.0, 1.0);
    std_normal.inverse_cdf(p).clamp(lo, hi)
}

fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![min];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n).map(|i| min + step * i as f64).collect()
}

/// Evenly spread `n` indices over `0..len`, keeping the endpoints
fn spread_indices(len: usize, n: usize) -> Vec<f64> {
    if n >= len {
        return (0..len).map(|i| i as f64).collect();
    }
    let mut picked: Vec<usize> = (0..n)
        .map(|i| ((i * (len - 1)) as f64 / (n - 1) as f64).round() as usize)
        .collect();
    picked.dedup();
    picked.into_iter().map(|i| i as f64).collect()
}

impl ParameterSource for ParamDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_value(&self) -> f64 {
        self.default
    }

    fn rand(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match &self.kind {
            ParamKind::Float(FloatDistribution::Fixed) => self.default,
            ParamKind::Float(FloatDistribution::Linear { min, max }) => min + u * (max - min),
            ParamKind::Float(FloatDistribution::Triangle { min, max }) => {
                let width = max - min;
                if width <= 0.0 {
                    return *min;
                }
                let mode = self.default;
                let split = (mode - min) / width;
                if u < split {
                    min + (u * width * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * width * (max - mode)).sqrt()
                }
            }
            ParamKind::Float(FloatDistribution::Normal { std, min, max }) => {
                if *std <= 0.0 {
                    return self.default.clamp(*min, *max);
                }
                let z = truncated_standard_normal(
                    u,
                    (min - self.default) / std,
                    (max - self.default) / std,
                );
                (self.default + std * z).clamp(*min, *max)
            }
            ParamKind::Float(FloatDistribution::LogNormal { std, min, max }) => {
                if *std <= 0.0 || self.default <= 0.0 {
                    return self.default.clamp(*min, *max);
                }
                let mu = self.default.ln();
                let lo = if *min > 0.0 {
                    (min.ln() - mu) / std
                } else {
                    f64::NEG_INFINITY
                };
                let hi = (max.ln() - mu) / std;
                let z = truncated_standard_normal(u, lo, hi);
                (mu + std * z).exp().clamp(*min, *max)
            }
            ParamKind::Enum { values, weights } => {
                let cumulative = Self::cumulative_weights(values, weights.as_ref());
                // u = 1 and rounding in the last sum fall through to the last
                // label that can actually be drawn.
                let last_drawable = weights
                    .as_ref()
                    .and_then(|w| w.iter().rposition(|&x| x > 0.0))
                    .unwrap_or(values.len().saturating_sub(1));
                let idx = cumulative
                    .iter()
                    .position(|c| u < *c)
                    .unwrap_or(last_drawable);
                idx as f64
            }
            ParamKind::Bool => {
                if u >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    fn range(&self, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        match &self.kind {
            ParamKind::Float(FloatDistribution::Fixed) => vec![self.default; n],
            ParamKind::Float(
                FloatDistribution::Linear { min, max }
                | FloatDistribution::Triangle { min, max }
                | FloatDistribution::Normal { min, max, .. }
                | FloatDistribution::LogNormal { min, max, .. },
            ) => {
                if n == 1 {
                    vec![self.default]
                } else {
                    linspace(*min, *max, n)
                }
            }
            ParamKind::Enum { values, .. } => {
                if n == 1 {
                    vec![self.default]
                } else {
                    spread_indices(values.len(), n)
                }
            }
            ParamKind::Bool => {
                if n == 1 {
                    vec![self.default]
                } else {
                    vec![0.0, 1.0]
                }
            }
        }
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn is_variable(&self) -> bool {
        !matches!(self.kind, ParamKind::Float(FloatDistribution::Fixed))
    }

    fn is_continuous(&self) -> bool {
        matches!(self.kind, ParamKind::Float(_))
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(SensitivityError::invalid("parameter name must not be empty"));
        }
        if !self.default.is_finite() {
            return Err(self.invalid("default value must be finite"));
        }
        match &self.kind {
            ParamKind::Float(distribution) => self.validate_float(distribution)?,
            ParamKind::Enum { values, weights } => {
                if values.is_empty() {
                    return Err(self.invalid("enum must have at least one value"));
                }
                if !self.contains(self.default) {
                    return Err(self.invalid("default label is not among the enum values"));
                }
                if let Some(w) = weights {
                    if w.len() != values.len() {
                        return Err(self.invalid("one weight is required per enum value"));
                    }
                    if w.iter().any(|x| !x.is_finite() || *x < 0.0) || w.iter().sum::<f64>() <= 0.0
                    {
                        return Err(self.invalid("weights must be non-negative with a positive sum"));
                    }
                }
            }
            ParamKind::Bool => {
                if !self.contains(self.default) {
                    return Err(self.invalid("boolean default must be 0 or 1"));
                }
            }
        }
        Ok(())
    }
}

impl ParamDef {
    fn validate_float(&self, distribution: &FloatDistribution) -> Result<()> {
        let (min, max) = match distribution {
            FloatDistribution::Fixed => return Ok(()),
            FloatDistribution::Linear { min, max }
            | FloatDistribution::Triangle { min, max }
            | FloatDistribution::Normal { min, max, .. }
            | FloatDistribution::LogNormal { min, max, .. } => (*min, *max),
        };
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(self.invalid("bounds must be finite with min <= max"));
        }
        if self.default < min || self.default > max {
            return Err(self.invalid("default must lie within [min, max]"));
        }
        match distribution {
            FloatDistribution::Normal { std, .. } | FloatDistribution::LogNormal { std, .. }
                if !(std.is_finite() && *std > 0.0) =>
            {
                Err(self.invalid("std must be positive and finite"))
            }
            FloatDistribution::LogNormal { .. } if self.default <= 0.0 => {
                Err(self.invalid("log-normal default must be positive"))
            }
            _ => Ok(()),
        }
    }
}

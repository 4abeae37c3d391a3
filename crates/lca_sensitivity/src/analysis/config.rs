//! Configuration types for the sensitivity analyses.

use serde::{Deserialize, Serialize};

use crate::sampling::group_size;

/// Settings for Saltelli sampling and Sobol index estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SobolConfig {
    /// Base sample count `n`; the design has `n * (2k + 2)` rows
    #[serde(default = "default_base_count")]
    pub base_count: usize,
    /// Include the `BA_j` rows needed for second-order indices
    #[serde(default = "default_true")]
    pub calc_second_order: bool,
    /// Bootstrap resamples for the confidence intervals (0 disables them)
    #[serde(default = "default_num_resamples")]
    pub num_resamples: usize,
    /// Confidence level of the bootstrap intervals
    #[serde(default = "default_conf_level")]
    pub conf_level: f64,
    /// Randomize the base sequence with a digital shift
    #[serde(default = "default_true")]
    pub scramble: bool,
    /// Seed for every random draw of the analysis; `None` draws a fresh one
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_base_count() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_num_resamples() -> usize {
    100
}

fn default_conf_level() -> f64 {
    0.95
}

impl Default for SobolConfig {
    fn default() -> Self {
        Self {
            base_count: default_base_count(),
            calc_second_order: true,
            num_resamples: default_num_resamples(),
            conf_level: default_conf_level(),
            scramble: true,
            seed: None,
        }
    }
}

impl SobolConfig {
    /// Rows in one radial group for `k` parameters
    pub fn group_size(&self, k: usize) -> usize {
        group_size(k, self.calc_second_order)
    }

    /// Number of model evaluations a design over `k` parameters costs.
    pub fn row_count(&self, k: usize) -> usize {
        self.base_count * self.group_size(k)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Settings for one-at-a-time sweeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OatConfig {
    /// Values taken from each parameter's range
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_steps() -> usize {
    10
}

impl Default for OatConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count() {
        let config = SobolConfig {
            base_count: 4,
            ..Default::default()
        };
        assert_eq!(config.row_count(1), 16);
        assert_eq!(config.row_count(3), 32);

        let first_order = SobolConfig {
            base_count: 4,
            calc_second_order: false,
            ..Default::default()
        };
        assert_eq!(first_order.row_count(3), 20);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SobolConfig = serde_json::from_str(r#"{"base_count": 64, "seed": 3}"#).unwrap();
        assert_eq!(config.base_count, 64);
        assert_eq!(config.seed, Some(3));
        assert!(config.calc_second_order);
        assert!(config.scramble);
        assert_eq!(config.num_resamples, 100);

        let oat: OatConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(oat.steps, 10);
    }
}

use serde::Serialize;
use thiserror::Error;

/// Errors raised by an impact model while evaluating a parameter assignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("parameter `{0}` is required by the model but missing from the assignment")]
    MissingParameter(String),

    #[error("parameter `{name}` has {len} values, expected {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("model was compiled for impacts {compiled:?}, evaluation requested {requested:?}")]
    ImpactMismatch {
        compiled: Vec<String>,
        requested: Vec<String>,
    },
}

/// Errors from low-discrepancy sequence construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    #[error("sequence dimension must be at least 1")]
    ZeroDimension,

    #[error("Sobol sequence supports at most {max} dimensions, requested {requested}")]
    DimensionTooLarge { requested: usize, max: usize },
}

/// Per-impact failure of the Sobol estimators.
///
/// Never aborts a batch: the failing impact gets zeroed indices and the
/// failure is recorded alongside the results.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimationFailure {
    #[error("output column contains {count} non-finite values")]
    NonFiniteOutput { count: usize },

    #[error("output variance {variance:e} is too small to estimate indices")]
    ZeroVariance { variance: f64 },

    #[error("estimated index for parameter `{parameter}` is not finite")]
    NonFiniteIndex { parameter: String },
}

/// Fatal errors: malformed inputs abort the whole analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensitivityError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("invalid definition for parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl SensitivityError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SensitivityError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SensitivityError>;

//! Error taxonomy for the forecasting engine
//!
//! Per-cell failures (`ForecastError`) are recovered by the orchestrator and
//! recorded on the affected result. Configuration and matrix errors are fatal
//! and surface before any fitting work starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single fit/forecast attempt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Series shorter than the predictor's minimum, or horizon larger than
    /// the available history
    #[error("insufficient data: need {required} observations, have {actual}")]
    DataInsufficiency { required: usize, actual: usize },

    /// A statistical fit did not produce a usable model
    #[error("{model} failed to converge: {reason}")]
    NonConvergence { model: String, reason: String },
}

impl ForecastError {
    pub fn insufficient(required: usize, actual: usize) -> Self {
        Self::DataInsufficiency { required, actual }
    }

    pub fn non_convergence(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NonConvergence {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Reason code recorded on a failed result
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::DataInsufficiency { .. } => FailureReason::DataInsufficiency,
            Self::NonConvergence { .. } => FailureReason::NonConvergence,
        }
    }
}

/// Invalid run configuration, detected at run construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown predictor '{0}'")]
    UnknownPredictor(String),

    #[error("unknown predictor code {0} (valid codes are 0-12)")]
    UnknownPredictorCode(usize),

    #[error("unknown emergence label '{0}' (expected emergent, stationary or declining)")]
    UnknownEmergenceLabel(String),

    #[error("no predictors selected")]
    NoPredictors,

    #[error("unknown term '{0}' (not present in the term-count matrix)")]
    UnknownTerm(String),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}

impl ConfigurationError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Malformed term-count matrix
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("invalid quarter '{0}' (expected e.g. 2015Q3)")]
    InvalidQuarter(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("quarters are not contiguous: {previous} is followed by {next}")]
    NonContiguousQuarters { previous: String, next: String },

    #[error("term '{term}' has {actual} counts, expected {expected}")]
    RaggedRow {
        term: String,
        expected: usize,
        actual: usize,
    },

    #[error("totals row has {actual} entries, expected {expected}")]
    RaggedTotals { expected: usize, actual: usize },

    #[error("duplicate term '{0}'")]
    DuplicateTerm(String),

    #[error("matrix has no quarters")]
    Empty,
}

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Reason code attached to a failed evaluation cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    DataInsufficiency,
    NonConvergence,
    WorkerFailure,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataInsufficiency => "data_insufficiency",
            Self::NonConvergence => "non_convergence",
            Self::WorkerFailure => "worker_failure",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Core data models for the forecasting engine

use crate::error::{ConfigurationError, FailureReason, ForecastError, MatrixError};
use crate::series::Quarter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One bucket of a term's series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub quarter: Quarter,
    /// Raw number of occurrences in the bucket
    pub count: u64,
    /// Value fed to predictors: the raw count, or its normalized share
    pub value: f64,
}

/// Ordered, gap-free count series for a single term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    term: String,
    points: Vec<SeriesPoint>,
    normalized: bool,
}

impl TimeSeries {
    pub fn new(
        term: impl Into<String>,
        points: Vec<SeriesPoint>,
        normalized: bool,
    ) -> Result<Self, MatrixError> {
        for pair in points.windows(2) {
            if pair[1].quarter != pair[0].quarter.succ() {
                return Err(MatrixError::NonContiguousQuarters {
                    previous: pair[0].quarter.to_string(),
                    next: pair[1].quarter.to_string(),
                });
            }
        }
        Ok(Self {
            term: term.into(),
            points,
            normalized,
        })
    }

    pub(crate) fn from_contiguous(
        term: String,
        points: Vec<SeriesPoint>,
        normalized: bool,
    ) -> Self {
        Self {
            term,
            points,
            normalized,
        }
    }

    /// Raw series of consecutive quarters starting at `start`
    pub fn from_counts(term: impl Into<String>, start: Quarter, counts: &[u64]) -> Self {
        let points = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| SeriesPoint {
                quarter: start.offset(i),
                count,
                value: count as f64,
            })
            .collect();
        Self {
            term: term.into(),
            points,
            normalized: false,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }

    pub fn max_count(&self) -> u64 {
        self.points.iter().map(|p| p.count).max().unwrap_or(0)
    }

    pub fn first_quarter(&self) -> Option<Quarter> {
        self.points.first().map(|p| p.quarter)
    }

    pub fn last_quarter(&self) -> Option<Quarter> {
        self.points.last().map(|p| p.quarter)
    }
}

/// Trend classification of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergenceLabel {
    Emergent,
    Stationary,
    Declining,
}

impl EmergenceLabel {
    pub const ALL: [EmergenceLabel; 3] = [
        EmergenceLabel::Emergent,
        EmergenceLabel::Stationary,
        EmergenceLabel::Declining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergent => "emergent",
            Self::Stationary => "stationary",
            Self::Declining => "declining",
        }
    }
}

impl fmt::Display for EmergenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmergenceLabel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergent" => Ok(Self::Emergent),
            "stationary" => Ok(Self::Stationary),
            "declining" => Ok(Self::Declining),
            _ => Err(ConfigurationError::UnknownEmergenceLabel(s.to_string())),
        }
    }
}

/// A forecast value for a future (or held-out) quarter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub quarter: Quarter,
    pub value: f64,
}

/// Forecast accuracy against held-out actuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Symmetric mean absolute percentage error, in [0, 2]
    pub smape: f64,
    /// Mean absolute percentage error; undefined when every actual is zero
    pub mape: Option<f64>,
}

/// Outcome of one (term, predictor) evaluation cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CellStatus {
    Completed,
    Failed {
        reason: FailureReason,
        message: String,
    },
}

/// Forecast for one term by one predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub term: String,
    pub predictor: String,
    pub label: Option<EmergenceLabel>,
    pub forecast: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actuals: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitted_curve: Option<Vec<Option<f64>>>,
    #[serde(flatten)]
    pub status: CellStatus,
    pub duration_us: u64,
}

impl ForecastResult {
    pub fn failed(
        term: impl Into<String>,
        predictor: impl Into<String>,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            predictor: predictor.into(),
            label: None,
            forecast: Vec::new(),
            actuals: None,
            errors: None,
            fitted_curve: None,
            status: CellStatus::Failed {
                reason,
                message: message.into(),
            },
            duration_us: 0,
        }
    }

    pub fn from_error(
        term: impl Into<String>,
        predictor: impl Into<String>,
        error: &ForecastError,
    ) -> Self {
        Self::failed(term, predictor, error.reason(), error.to_string())
    }

    pub fn with_label(mut self, label: Option<EmergenceLabel>) -> Self {
        self.label = label;
        self
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, CellStatus::Completed)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.status {
            CellStatus::Completed => None,
            CellStatus::Failed { reason, .. } => Some(*reason),
        }
    }

    pub fn forecast_values(&self) -> Vec<f64> {
        self.forecast.iter().map(|p| p.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_is_contiguous() {
        let start: Quarter = "2019Q3".parse().unwrap();
        let series = TimeSeries::from_counts("graphene", start, &[1, 0, 4]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_quarter().unwrap().to_string(), "2020Q1");
        assert_eq!(series.values(), vec![1.0, 0.0, 4.0]);
        assert_eq!(series.max_count(), 4);
        assert!(!series.is_normalized());
    }

    #[test]
    fn test_new_rejects_gaps() {
        let q1: Quarter = "2019Q1".parse().unwrap();
        let points = vec![
            SeriesPoint { quarter: q1, count: 1, value: 1.0 },
            SeriesPoint { quarter: q1.offset(2), count: 1, value: 1.0 },
        ];
        assert!(TimeSeries::new("x", points, false).is_err());
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("Emergent".parse::<EmergenceLabel>().unwrap(), EmergenceLabel::Emergent);
        assert_eq!(" declining ".parse::<EmergenceLabel>().unwrap(), EmergenceLabel::Declining);
        assert!(matches!(
            "rising".parse::<EmergenceLabel>(),
            Err(ConfigurationError::UnknownEmergenceLabel(_))
        ));
    }

    #[test]
    fn test_failed_result_serializes_reason() {
        let err = ForecastError::insufficient(5, 3);
        let result = ForecastResult::from_error("drone", "ARIMA", &err);
        assert!(!result.is_completed());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "data_insufficiency");
    }
}

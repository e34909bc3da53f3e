//! Train/test evaluation of one predictor on one series

use crate::error::{ConfigurationError, ForecastError};
use crate::models::{CellStatus, ErrorMetrics, ForecastPoint, ForecastResult, TimeSeries};
use crate::predictor::{FitContext, Forecaster, PredictorSpec};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Shortest training prefix the harness will fit on
pub const MIN_TRAIN_POINTS: usize = 2;

/// Per-run evaluation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessOptions {
    /// Forecast horizon in quarters
    pub horizon: usize,
    /// Hold out the last `horizon` points and score against them
    pub train_test: bool,
    /// Attach the in-sample fitted curve
    pub curves: bool,
    /// Seed for stochastic predictors
    pub seed: u64,
}

/// Fits predictors on series prefixes and scores their forecasts
#[derive(Debug, Clone)]
pub struct EvaluationHarness {
    options: HarnessOptions,
}

impl EvaluationHarness {
    pub fn new(options: HarnessOptions) -> Result<Self, ConfigurationError> {
        if options.horizon == 0 {
            return Err(ConfigurationError::invalid(
                "steps_ahead",
                "forecast horizon must be at least 1",
            ));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    /// Length of the training prefix for a series of `len` points
    pub fn train_len(&self, len: usize) -> Result<usize, ForecastError> {
        let horizon = self.options.horizon;
        if !self.options.train_test {
            return Ok(len);
        }
        let min_train = MIN_TRAIN_POINTS.max(horizon);
        if len < horizon + min_train {
            return Err(ForecastError::insufficient(horizon + min_train, len));
        }
        Ok(len - horizon)
    }

    /// Evaluate one cell; failures are recorded on the result
    pub fn evaluate(&self, series: &TimeSeries, spec: &PredictorSpec) -> ForecastResult {
        let started = Instant::now();
        let mut result = match self.try_evaluate(series, spec) {
            Ok(result) => result,
            Err(e) => ForecastResult::from_error(series.term(), spec.name(), &e),
        };
        result.duration_us = started.elapsed().as_micros() as u64;
        result
    }

    /// Evaluate one cell, returning the first failure
    pub fn try_evaluate(
        &self,
        series: &TimeSeries,
        spec: &PredictorSpec,
    ) -> Result<ForecastResult, ForecastError> {
        let horizon = self.options.horizon;
        let values = series.values();
        let train_len = self.train_len(values.len())?;
        let (train, test) = values.split_at(train_len);

        let last_train = match train_len.checked_sub(1) {
            Some(idx) => series.points()[idx].quarter,
            None => return Err(ForecastError::insufficient(1, 0)),
        };

        let ctx = FitContext {
            horizon,
            seed: self.options.seed,
        };
        let model = spec.fit(train, &ctx)?;
        let predicted = model.forecast(horizon)?;
        if predicted.len() != horizon {
            return Err(ForecastError::non_convergence(
                spec.name(),
                format!("produced {} of {} forecast steps", predicted.len(), horizon),
            ));
        }

        let (actuals, errors) = if self.options.train_test {
            (Some(test.to_vec()), ErrorMetrics::compute(test, &predicted))
        } else {
            (None, None)
        };

        debug!(
            term = series.term(),
            predictor = spec.name(),
            train_len,
            horizon,
            "Evaluated predictor"
        );

        Ok(ForecastResult {
            term: series.term().to_string(),
            predictor: spec.name().to_string(),
            label: None,
            forecast: predicted
                .into_iter()
                .enumerate()
                .map(|(h, value)| ForecastPoint {
                    quarter: last_train.offset(h + 1),
                    value,
                })
                .collect(),
            actuals,
            errors,
            fitted_curve: self.options.curves.then(|| model.fitted_curve()),
            status: CellStatus::Completed,
            duration_us: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;
    use crate::series::Quarter;

    fn options(horizon: usize, train_test: bool) -> HarnessOptions {
        HarnessOptions {
            horizon,
            train_test,
            curves: false,
            seed: 42,
        }
    }

    fn six_points() -> TimeSeries {
        TimeSeries::from_counts("widget", Quarter::new(2018, 1).unwrap(), &[3, 5, 7, 9, 11, 13])
    }

    fn linear() -> PredictorSpec {
        PredictorSpec::resolve("Linear").unwrap()[0]
    }

    #[test]
    fn test_zero_horizon_rejected() {
        assert!(EvaluationHarness::new(options(0, true)).is_err());
    }

    #[test]
    fn test_holdout_trains_on_prefix() {
        let harness = EvaluationHarness::new(options(2, true)).unwrap();
        assert_eq!(harness.train_len(6).unwrap(), 4);

        let result = harness.try_evaluate(&six_points(), &linear()).unwrap();
        assert_eq!(result.actuals, Some(vec![11.0, 13.0]));
        let forecast = result.forecast_values();
        assert!((forecast[0] - 11.0).abs() < 1e-9);
        assert!((forecast[1] - 13.0).abs() < 1e-9);
        assert!(result.errors.unwrap().mae < 1e-9);
        assert_eq!(result.forecast[0].quarter, Quarter::new(2019, 1).unwrap());
    }

    #[test]
    fn test_horizon_longer_than_history_fails() {
        let harness = EvaluationHarness::new(options(5, true)).unwrap();
        let result = harness.evaluate(&six_points(), &linear());
        assert_eq!(result.failure_reason(), Some(FailureReason::DataInsufficiency));
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn test_pure_forecast_extends_past_last_quarter() {
        let harness = EvaluationHarness::new(options(3, false)).unwrap();
        let result = harness.try_evaluate(&six_points(), &PredictorSpec::Naive).unwrap();
        assert!(result.errors.is_none());
        assert!(result.actuals.is_none());
        assert_eq!(result.forecast_values(), vec![13.0; 3]);
        assert_eq!(result.forecast[0].quarter, Quarter::new(2019, 3).unwrap());
    }

    #[test]
    fn test_curves_cover_training_range() {
        let harness = EvaluationHarness::new(HarnessOptions {
            curves: true,
            ..options(2, true)
        })
        .unwrap();
        let result = harness.try_evaluate(&six_points(), &linear()).unwrap();
        assert_eq!(result.fitted_curve.map(|c| c.len()), Some(4));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let series = TimeSeries::from_counts(
            "gadget",
            Quarter::new(2016, 2).unwrap(),
            &[4, 9, 5, 12, 8, 15, 11, 18, 14, 21, 17, 24],
        );
        let harness = EvaluationHarness::new(options(2, true)).unwrap();
        for spec in PredictorSpec::all() {
            let a = harness.evaluate(&series, spec);
            let b = harness.evaluate(&series, spec);
            assert_eq!(a.forecast, b.forecast, "{}", spec);
            assert_eq!(a.errors, b.errors, "{}", spec);
            assert_eq!(a.status, b.status, "{}", spec);
        }
    }
}

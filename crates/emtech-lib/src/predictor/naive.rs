//! Naive persistence forecast

use super::Forecaster;
use crate::error::ForecastError;

/// Repeats the last observed value
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveModel {
    history: Vec<f64>,
}

impl NaiveModel {
    pub fn fit(train: &[f64]) -> Result<Self, ForecastError> {
        if train.is_empty() {
            return Err(ForecastError::insufficient(1, 0));
        }
        Ok(Self {
            history: train.to_vec(),
        })
    }

    pub fn last_value(&self) -> f64 {
        // fit guarantees a non-empty history
        self.history[self.history.len() - 1]
    }
}

impl Forecaster for NaiveModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        Ok(vec![self.last_value(); horizon])
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        std::iter::once(None)
            .chain(self.history.iter().map(|&v| Some(v)))
            .take(self.history.len())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_last_value() {
        let model = NaiveModel::fit(&[3.0, 8.0, 5.0]).unwrap();
        assert_eq!(model.forecast(4).unwrap(), vec![5.0; 4]);
    }

    #[test]
    fn test_single_point() {
        let model = NaiveModel::fit(&[7.0]).unwrap();
        assert_eq!(model.forecast(2).unwrap(), vec![7.0, 7.0]);
        assert_eq!(model.fitted_curve(), vec![None]);
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(
            NaiveModel::fit(&[]).unwrap_err(),
            ForecastError::insufficient(1, 0)
        );
    }

    #[test]
    fn test_fitted_curve_lags_by_one() {
        let model = NaiveModel::fit(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(model.fitted_curve(), vec![None, Some(1.0), Some(2.0)]);
    }
}

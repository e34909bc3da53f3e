//! Forecast accuracy metrics
//!
//! Percentage errors are decimals, not percentages.

use crate::models::ErrorMetrics;

/// Mean absolute error
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}

/// Symmetric MAPE; a step where both values are zero contributes 0
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom < f64::EPSILON {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum();
    sum / actual.len() as f64
}

/// MAPE over the steps with a non-zero actual; `None` if there are none
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.len() != predicted.len() {
        return None;
    }
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| a.abs() >= f64::EPSILON)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(terms.iter().sum::<f64>() / terms.len() as f64)
}

impl ErrorMetrics {
    /// All metrics for a forecast against held-out actuals
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.len() != predicted.len() || actual.is_empty() {
            return None;
        }
        Some(Self {
            mae: mae(actual, predicted),
            rmse: rmse(actual, predicted),
            smape: smape(actual, predicted),
            mape: mape(actual, predicted),
        })
    }
}

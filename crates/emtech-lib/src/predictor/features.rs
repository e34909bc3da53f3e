//! Series preprocessing shared by predictors and the classifier
//!
//! Min-max scaling, sliding training windows, and trend statistics.

/// Minimum spread treated as a non-flat series when scaling
const MIN_RANGE: f64 = 1e-12;

/// Min-max scaler fitted on a training prefix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fit on `values`; flat series scale by 1 so they map to zero
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, range: 1.0 };
        }
        let range = max - min;
        Self {
            min,
            range: if range < MIN_RANGE { 1.0 } else { range },
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn scale_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.scale(v)).collect()
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }
}

/// A supervised training sample cut from a series
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

/// Sliding windows of `window` inputs followed by `targets` consecutive
/// values, starting `offset` steps after the window
///
/// `offset == 0` means the first target immediately follows the window.
pub fn sliding_samples(series: &[f64], window: usize, targets: usize, offset: usize) -> Vec<Sample> {
    let span = window + offset + targets;
    if window == 0 || targets == 0 || series.len() < span {
        return Vec::new();
    }
    (0..=series.len() - span)
        .map(|start| Sample {
            input: series[start..start + window].to_vec(),
            target: series[start + window + offset..start + span].to_vec(),
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate linear regression slope for trend detection
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

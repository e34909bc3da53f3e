//! Least-squares polynomial trend (linear, quadratic, cubic)

use super::linalg::least_squares;
use super::naive::NaiveModel;
use super::Forecaster;
use crate::error::ForecastError;
use serde::{Deserialize, Serialize};

/// Polynomial degree of a trend predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolynomialConfig {
    pub degree: usize,
}

/// Fitted polynomial, or the naive fallback for too-short prefixes
#[derive(Debug, Clone, PartialEq)]
pub enum PolynomialModel {
    Fitted(PolynomialFit),
    Fallback(NaiveModel),
}

/// Coefficients over the rescaled index `t = i / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    coefficients: Vec<f64>,
    scale: f64,
    n_observations: usize,
}

impl PolynomialFit {
    fn evaluate(&self, index: f64) -> f64 {
        let t = index / self.scale;
        // Horner
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl PolynomialModel {
    pub fn fit(config: &PolynomialConfig, train: &[f64]) -> Result<Self, ForecastError> {
        if train.len() < config.degree + 1 {
            return NaiveModel::fit(train).map(Self::Fallback);
        }

        let scale = (train.len() - 1).max(1) as f64;
        let rows: Vec<Vec<f64>> = (0..train.len())
            .map(|i| {
                let t = i as f64 / scale;
                (0..=config.degree).map(|k| t.powi(k as i32)).collect()
            })
            .collect();

        let coefficients = least_squares(&rows, train).ok_or_else(|| {
            ForecastError::non_convergence(
                polynomial_name(config.degree),
                "singular normal equations",
            )
        })?;

        Ok(Self::Fitted(PolynomialFit {
            coefficients,
            scale,
            n_observations: train.len(),
        }))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

impl Forecaster for PolynomialModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        match self {
            Self::Fallback(naive) => naive.forecast(horizon),
            Self::Fitted(fit) => Ok((0..horizon)
                .map(|h| fit.evaluate((fit.n_observations + h) as f64))
                .collect()),
        }
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        match self {
            Self::Fallback(naive) => naive.fitted_curve(),
            Self::Fitted(fit) => (0..fit.n_observations)
                .map(|i| Some(fit.evaluate(i as f64)))
                .collect(),
        }
    }
}

pub(crate) fn polynomial_name(degree: usize) -> &'static str {
    match degree {
        1 => "Linear",
        2 => "Quadratic",
        3 => "Cubic",
        _ => "Polynomial",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(coeffs: &[f64], range: std::ops::Range<usize>) -> Vec<f64> {
        range
            .map(|i| {
                let x = i as f64;
                coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
            })
            .collect()
    }

    fn assert_reproduces(degree: usize, coeffs: &[f64]) {
        let train = generate(coeffs, 0..12);
        let future = generate(coeffs, 12..16);
        let model = PolynomialModel::fit(&PolynomialConfig { degree }, &train).unwrap();
        let forecast = model.forecast(4).unwrap();
        for (f, a) in forecast.iter().zip(&future) {
            assert!(
                (f - a).abs() <= 1e-6 * a.abs().max(1.0),
                "degree {}: forecast {} vs actual {}",
                degree,
                f,
                a
            );
        }
    }

    #[test]
    fn test_linear_exact() {
        assert_reproduces(1, &[4.0, 2.5]);
    }

    #[test]
    fn test_quadratic_exact() {
        assert_reproduces(2, &[1.0, -3.0, 0.75]);
    }

    #[test]
    fn test_cubic_exact() {
        assert_reproduces(3, &[2.0, 3.0, -0.5, 0.1]);
    }

    #[test]
    fn test_short_prefix_falls_back_to_naive() {
        let model = PolynomialModel::fit(&PolynomialConfig { degree: 3 }, &[1.0, 4.0, 9.0]).unwrap();
        assert!(model.is_fallback());
        assert_eq!(model.forecast(2).unwrap(), vec![9.0, 9.0]);
    }

    #[test]
    fn test_fitted_curve_covers_training_range() {
        let train = generate(&[1.0, 1.0], 0..6);
        let model = PolynomialModel::fit(&PolynomialConfig { degree: 1 }, &train).unwrap();
        let curve = model.fitted_curve();
        assert_eq!(curve.len(), 6);
        for (c, y) in curve.iter().zip(&train) {
            assert!((c.unwrap() - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(polynomial_name(1), "Linear");
        assert_eq!(polynomial_name(2), "Quadratic");
        assert_eq!(polynomial_name(3), "Cubic");
    }
}

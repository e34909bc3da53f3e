//! Holt-Winters exponential smoothing
//!
//! Additive trend, plus additive seasonality when the prefix holds at least
//! two full seasons. Smoothing parameters are chosen by minimising the
//! one-step-ahead squared error: a coarse grid, then a pattern search that
//! must shrink its step below tolerance within a budget of step halvings.

use super::Forecaster;
use crate::error::ForecastError;
use serde::{Deserialize, Serialize};

const MODEL_NAME: &str = "Holt-Winters";

/// Minimum observations for a trend-only fit
pub const MIN_OBSERVATIONS: usize = 3;

const GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
const INITIAL_STEP: f64 = 0.1;
const STEP_TOLERANCE: f64 = 1e-4;
const PARAM_FLOOR: f64 = 0.001;
const PARAM_CEIL: f64 = 0.999;
/// Improving sweeps allowed at one step size before it is halved anyway
const MAX_SWEEPS_PER_STEP: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoltWintersConfig {
    /// Observations per seasonal cycle (4 for quarterly data)
    pub season_length: usize,
    /// Pattern-search budget, counted in step halvings
    pub max_iterations: usize,
}

impl Default for HoltWintersConfig {
    fn default() -> Self {
        Self {
            season_length: 4,
            max_iterations: 50,
        }
    }
}

/// Smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Smoothed state after a pass over the data
#[derive(Debug, Clone, PartialEq)]
struct SmoothedState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    one_step: Vec<Option<f64>>,
    sse: f64,
}

/// Fitted Holt-Winters model
#[derive(Debug, Clone, PartialEq)]
pub struct HoltWintersModel {
    params: Smoothing,
    n_observations: usize,
    state: SmoothedState,
}

impl HoltWintersModel {
    pub fn fit(config: &HoltWintersConfig, train: &[f64]) -> Result<Self, ForecastError> {
        if train.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::insufficient(MIN_OBSERVATIONS, train.len()));
        }
        let season = (config.season_length >= 2 && train.len() >= 2 * config.season_length)
            .then_some(config.season_length);

        let gammas: &[f64] = if season.is_some() { &GRID } else { &[0.0] };
        let mut best: Option<(Smoothing, f64)> = None;
        for &alpha in &GRID {
            for &beta in &GRID {
                for &gamma in gammas {
                    let params = Smoothing { alpha, beta, gamma };
                    let sse = smooth(train, season, &params).sse;
                    if sse.is_finite() && best.map_or(true, |(_, b)| sse < b) {
                        best = Some((params, sse));
                    }
                }
            }
        }
        let (start, start_sse) = best.ok_or_else(|| {
            ForecastError::non_convergence(MODEL_NAME, "no smoothing parameters give a finite error")
        })?;

        let params = refine(train, season, start, start_sse, config.max_iterations)?;
        let state = smooth(train, season, &params);

        Ok(Self {
            params,
            n_observations: train.len(),
            state,
        })
    }

    pub fn params(&self) -> Smoothing {
        self.params
    }

    pub fn is_seasonal(&self) -> bool {
        !self.state.seasonal.is_empty()
    }
}

impl Forecaster for HoltWintersModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let season = self.state.seasonal.len();
        let forecast: Vec<f64> = (1..=horizon)
            .map(|h| {
                let seasonal = if season > 0 {
                    self.state.seasonal[(self.n_observations + h - 1) % season]
                } else {
                    0.0
                };
                self.state.level + h as f64 * self.state.trend + seasonal
            })
            .collect();
        if forecast.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::non_convergence(MODEL_NAME, "forecast is not finite"));
        }
        Ok(forecast)
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        self.state.one_step.clone()
    }
}

/// Pattern search around `start`, halving the step until it is below tolerance
///
/// Only halvings count against `max_iterations`. Improving moves at a fixed
/// step are bounded by `MAX_SWEEPS_PER_STEP`.
fn refine(
    train: &[f64],
    season: Option<usize>,
    start: Smoothing,
    start_sse: f64,
    max_iterations: usize,
) -> Result<Smoothing, ForecastError> {
    let dims = if season.is_some() { 3 } else { 2 };
    let mut point = [start.alpha, start.beta, start.gamma];
    let mut best_sse = start_sse;
    let mut step = INITIAL_STEP;
    let mut halvings = 0;
    let mut sweeps = 0;

    while step >= STEP_TOLERANCE {
        let mut improved = false;
        for dim in 0..dims {
            for direction in [1.0, -1.0] {
                let mut candidate = point;
                candidate[dim] = (candidate[dim] + direction * step).clamp(PARAM_FLOOR, PARAM_CEIL);
                let params = Smoothing {
                    alpha: candidate[0],
                    beta: candidate[1],
                    gamma: candidate[2],
                };
                let sse = smooth(train, season, &params).sse;
                if sse.is_finite() && sse < best_sse - f64::EPSILON * best_sse.abs() {
                    point = candidate;
                    best_sse = sse;
                    improved = true;
                }
            }
        }
        sweeps += 1;

        if !improved || sweeps >= MAX_SWEEPS_PER_STEP {
            if halvings == max_iterations {
                return Err(ForecastError::non_convergence(
                    MODEL_NAME,
                    format!("parameter search did not settle within {} step halvings", max_iterations),
                ));
            }
            step /= 2.0;
            halvings += 1;
            sweeps = 0;
        }
    }

    Ok(Smoothing {
        alpha: point[0],
        beta: point[1],
        gamma: point[2],
    })
}

/// One smoothing pass, recording one-step-ahead predictions
fn smooth(data: &[f64], season: Option<usize>, p: &Smoothing) -> SmoothedState {
    match season {
        None => {
            let mut level = data[0];
            let mut trend = data[1] - data[0];
            let mut one_step = vec![None];
            let mut sse = 0.0;
            for &y in &data[1..] {
                let predicted = level + trend;
                one_step.push(Some(predicted));
                sse += (y - predicted).powi(2);
                let prev_level = level;
                level = p.alpha * y + (1.0 - p.alpha) * (level + trend);
                trend = p.beta * (level - prev_level) + (1.0 - p.beta) * trend;
            }
            SmoothedState {
                level,
                trend,
                seasonal: Vec::new(),
                one_step,
                sse,
            }
        }
        Some(m) => {
            let first = data[..m].iter().sum::<f64>() / m as f64;
            let second = data[m..2 * m].iter().sum::<f64>() / m as f64;
            let mut trend = (second - first) / m as f64;
            // state at the end of the first season; `first` sits at its midpoint
            let centre = (m - 1) as f64 / 2.0;
            let mut level = first + centre * trend;
            let mut seasonal: Vec<f64> = data[..m]
                .iter()
                .enumerate()
                .map(|(i, y)| y - (first + (i as f64 - centre) * trend))
                .collect();
            let mut one_step = vec![None; m];
            let mut sse = 0.0;
            for (t, &y) in data.iter().enumerate().skip(m) {
                let s = seasonal[t % m];
                let predicted = level + trend + s;
                one_step.push(Some(predicted));
                sse += (y - predicted).powi(2);
                let prev_level = level;
                level = p.alpha * (y - s) + (1.0 - p.alpha) * (level + trend);
                trend = p.beta * (level - prev_level) + (1.0 - p.beta) * trend;
                seasonal[t % m] = p.gamma * (y - level) + (1.0 - p.gamma) * s;
            }
            SmoothedState {
                level,
                trend,
                seasonal,
                one_step,
                sse,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data() {
        let err = HoltWintersModel::fit(&HoltWintersConfig::default(), &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, ForecastError::insufficient(3, 2));
    }

    #[test]
    fn test_linear_trend_extrapolated() {
        let train: Vec<f64> = (0..6).map(|i| 10.0 + 3.0 * i as f64).collect();
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        assert!(!model.is_seasonal());
        let forecast = model.forecast(3).unwrap();
        for (h, f) in forecast.iter().enumerate() {
            let expected = 10.0 + 3.0 * (6 + h) as f64;
            assert!((f - expected).abs() < 1e-6, "{} vs {}", f, expected);
        }
    }

    #[test]
    fn test_seasonal_pattern() {
        let pattern = [5.0, -3.0, 1.0, -3.0];
        let train: Vec<f64> = (0..16)
            .map(|i| 100.0 + 2.0 * i as f64 + pattern[i % 4])
            .collect();
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        assert!(model.is_seasonal());
        let forecast = model.forecast(4).unwrap();
        for (h, f) in forecast.iter().enumerate() {
            let i = 16 + h;
            let expected = 100.0 + 2.0 * i as f64 + pattern[i % 4];
            assert!((f - expected).abs() < 1e-6, "{} vs {}", f, expected);
        }
    }

    #[test]
    fn test_parameters_within_bounds() {
        let train = [3.0, 7.0, 4.0, 9.0, 6.0, 11.0, 8.0];
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        let p = model.params();
        for v in [p.alpha, p.beta] {
            assert!((PARAM_FLOOR..=PARAM_CEIL).contains(&v));
        }
    }

    #[test]
    fn test_exhausted_budget_reports_non_convergence() {
        let config = HoltWintersConfig {
            season_length: 4,
            max_iterations: 1,
        };
        let train = [3.0, 7.0, 4.0, 9.0, 6.0, 11.0, 8.0];
        let err = HoltWintersModel::fit(&config, &train).unwrap_err();
        assert!(matches!(err, ForecastError::NonConvergence { .. }));
    }

    #[test]
    fn test_noisy_trend_converges() {
        let train = [
            30.0, 59.0, 84.0, 101.0, 134.0, 159.0, 190.0, 214.0, 241.0, 266.0, 283.0, 311.0,
            338.0, 368.0, 388.0, 419.0, 439.0, 471.0, 490.0, 517.0,
        ];
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        assert!(model.is_seasonal());
        let forecast = model.forecast(3).unwrap();
        assert!(forecast.iter().all(|v| v.is_finite()));
        // roughly 25 per quarter
        assert!(forecast[0] > 480.0 && forecast[2] < 700.0, "{:?}", forecast);
    }

    #[test]
    fn test_trend_only_search_settles() {
        let train: Vec<f64> = (0..7)
            .map(|i| 40.0 + 12.0 * i as f64 + if i % 3 == 0 { 4.0 } else { -1.5 })
            .collect();
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        assert!(!model.is_seasonal());
        assert!(model.forecast(2).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fitted_curve_alignment() {
        let train: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let model = HoltWintersModel::fit(&HoltWintersConfig::default(), &train).unwrap();
        let curve = model.fitted_curve();
        assert_eq!(curve.len(), train.len());
    }
}

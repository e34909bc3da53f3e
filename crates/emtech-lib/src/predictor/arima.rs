//! ARIMA(p, d, q) forecasting
//!
//! - **I**: the prefix is differenced `d` times.
//! - **AR**: coefficients from the Yule-Walker equations (Levinson-Durbin)
//!   when `q == 0`, otherwise from the Hannan-Rissanen two-stage regression.
//! - **MA**: lagged innovations estimated from a long autoregression.
//!
//! An estimate is rejected as non-convergent when the regression is singular,
//! the AR polynomial is not stationary, the MA polynomial is not invertible,
//! or any residual is non-finite. A single MA coefficient outside the unit
//! circle is first replaced by its reciprocal, which has the same
//! autocovariance. A rejected order steps down to `(p, d, 0)` and then
//! `(0, d, 0)`; the first rejection is reported when every order fails.

use super::linalg::least_squares;
use super::Forecaster;
use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MODEL_NAME: &str = "ARIMA";

/// Variance below which the differenced series is treated as flat
const FLAT_VARIANCE: f64 = 1e-12;

/// Model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaConfig {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self { p: 1, d: 1, q: 1 }
    }
}

impl ArimaConfig {
    /// Order of the long autoregression used to estimate innovations
    fn long_ar_order(&self) -> usize {
        self.p + self.q + 1
    }

    /// Shortest prefix that leaves enough regression rows after differencing
    pub fn min_observations(&self) -> usize {
        self.d + self.long_ar_order() + self.p + self.q + 2
    }

    /// This order followed by the reduced orders tried when it is rejected
    fn step_down(&self) -> Vec<ArimaConfig> {
        let mut orders = vec![*self];
        if self.q > 0 {
            orders.push(ArimaConfig { q: 0, ..*self });
        }
        if self.p > 0 {
            orders.push(ArimaConfig { p: 0, q: 0, ..*self });
        }
        orders
    }
}

/// Fitted ARIMA model
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    config: ArimaConfig,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// Mean of the differenced series (drift)
    mean: f64,
    /// Differenced, mean-centred series
    centred: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value at each differencing level 0..d, for integration
    level_tails: Vec<f64>,
    train: Vec<f64>,
}

impl ArimaModel {
    pub fn fit(config: &ArimaConfig, train: &[f64]) -> Result<Self, ForecastError> {
        let required = config.min_observations();
        if train.len() < required {
            return Err(ForecastError::insufficient(required, train.len()));
        }
        if train.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::non_convergence(MODEL_NAME, "input contains non-finite values"));
        }

        let mut rejection = None;
        for order in config.step_down() {
            match Self::fit_order(&order, train) {
                Ok(model) => {
                    if let Some(err) = &rejection {
                        debug!(p = order.p, d = order.d, q = order.q, rejected = %err, "ARIMA order stepped down");
                    }
                    return Ok(model);
                }
                Err(err @ ForecastError::NonConvergence { .. }) => {
                    rejection.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(rejection
            .unwrap_or_else(|| ForecastError::non_convergence(MODEL_NAME, "no order could be estimated")))
    }

    /// Estimate exactly `config`, without stepping down
    pub fn fit_order(config: &ArimaConfig, train: &[f64]) -> Result<Self, ForecastError> {
        let required = config.min_observations();
        if train.len() < required {
            return Err(ForecastError::insufficient(required, train.len()));
        }

        let mut level_tails = Vec::with_capacity(config.d);
        let mut differenced = train.to_vec();
        for _ in 0..config.d {
            level_tails.push(differenced[differenced.len() - 1]);
            differenced = difference(&differenced);
        }

        let n = differenced.len();
        let mean = differenced.iter().sum::<f64>() / n as f64;
        let centred: Vec<f64> = differenced.iter().map(|v| v - mean).collect();
        let variance = centred.iter().map(|v| v * v).sum::<f64>() / n as f64;

        let (ar, ma) = if variance < FLAT_VARIANCE {
            // pure drift: nothing left to explain after differencing
            (vec![0.0; config.p], vec![0.0; config.q])
        } else if config.q == 0 {
            (levinson_durbin(&centred, config.p), Vec::new())
        } else {
            let (ar, ma) = hannan_rissanen(&centred, config)?;
            (ar, reflect_ma(ma))
        };
        check_polynomials(&ar, &ma)?;

        let residuals = innovations(&centred, &ar, &ma);
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(ForecastError::non_convergence(MODEL_NAME, "residual recursion diverged"));
        }

        Ok(Self {
            config: *config,
            ar,
            ma,
            mean,
            centred,
            residuals,
            level_tails,
            train: train.to_vec(),
        })
    }

    /// Order actually estimated, after any step-down
    pub fn order(&self) -> ArimaConfig {
        self.config
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Integrate forecasts on the differenced scale back to the original
    fn integrate(&self, mut values: Vec<f64>) -> Vec<f64> {
        for &tail in self.level_tails.iter().rev() {
            let mut running = tail;
            for v in values.iter_mut() {
                running += *v;
                *v = running;
            }
        }
        values
    }
}

impl Forecaster for ArimaModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let n = self.centred.len();
        let mut extended = self.centred.clone();
        let mut shocks = self.residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let next = one_step(&extended, &shocks, t, &self.ar, &self.ma);
            extended.push(next);
            shocks.push(0.0);
        }

        let differenced: Vec<f64> = extended[n..].iter().map(|v| v + self.mean).collect();
        let forecast = self.integrate(differenced);
        if forecast.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::non_convergence(MODEL_NAME, "forecast is not finite"));
        }
        Ok(forecast)
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        let d = self.config.d;
        let mut curve = vec![None; d.min(self.train.len())];
        for t in 0..self.centred.len() {
            // y_hat = w_hat + (y - w): the bracket only involves earlier values
            let predicted_w = one_step(&self.centred, &self.residuals, t, &self.ar, &self.ma) + self.mean;
            let actual_w = self.centred[t] + self.mean;
            curve.push(Some(predicted_w + self.train[t + d] - actual_w));
        }
        curve
    }
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Conditional one-step prediction of `series[t]` (centred scale)
fn one_step(series: &[f64], shocks: &[f64], t: usize, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(j, _)| t > *j)
        .map(|(j, phi)| phi * series[t - j - 1])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(j, _)| t > *j)
        .map(|(j, theta)| theta * shocks[t - j - 1])
        .sum();
    ar_part + ma_part
}

/// Conditional residuals, with pre-sample values taken as zero
fn innovations(series: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; series.len()];
    for t in 0..series.len() {
        residuals[t] = series[t] - one_step(series, &residuals, t, ar, ma);
    }
    residuals
}

/// Yule-Walker AR coefficients via the Levinson-Durbin recursion
fn levinson_durbin(series: &[f64], order: usize) -> Vec<f64> {
    if order == 0 {
        return Vec::new();
    }
    let n = series.len();
    let autocov: Vec<f64> = (0..=order)
        .map(|k| {
            if k >= n {
                return 0.0;
            }
            (k..n).map(|i| series[i] * series[i - k]).sum::<f64>() / n as f64
        })
        .collect();

    let mut coeffs = vec![0.0; order];
    let mut error = autocov[0];
    if error.abs() < FLAT_VARIANCE {
        return coeffs;
    }
    for k in 0..order {
        let acc: f64 = (0..k).map(|j| coeffs[j] * autocov[k - j]).sum();
        let reflection = (autocov[k + 1] - acc) / error;
        let previous = coeffs.clone();
        coeffs[k] = reflection;
        for j in 0..k {
            coeffs[j] = previous[j] - reflection * previous[k - 1 - j];
        }
        error *= 1.0 - reflection * reflection;
        if error.abs() < FLAT_VARIANCE {
            break;
        }
    }
    coeffs
}

/// Two-stage Hannan-Rissanen estimate of (AR, MA) coefficients
fn hannan_rissanen(series: &[f64], config: &ArimaConfig) -> Result<(Vec<f64>, Vec<f64>), ForecastError> {
    let n = series.len();
    let m = config.long_ar_order();
    let long_ar = levinson_durbin(series, m);

    let mut shocks = vec![0.0; n];
    for t in m..n {
        let fitted: f64 = (0..m).map(|j| long_ar[j] * series[t - j - 1]).sum();
        shocks[t] = series[t] - fitted;
    }

    let start = (m + config.q).max(config.p);
    let mut rows = Vec::with_capacity(n.saturating_sub(start));
    let mut targets = Vec::with_capacity(n.saturating_sub(start));
    for t in start..n {
        let mut row = Vec::with_capacity(config.p + config.q);
        row.extend((1..=config.p).map(|j| series[t - j]));
        row.extend((1..=config.q).map(|j| shocks[t - j]));
        rows.push(row);
        targets.push(series[t]);
    }
    if rows.len() <= config.p + config.q {
        return Err(ForecastError::insufficient(
            start + config.p + config.q + 1 + config.d,
            n + config.d,
        ));
    }

    let coeffs = least_squares(&rows, &targets)
        .ok_or_else(|| ForecastError::non_convergence(MODEL_NAME, "singular innovations regression"))?;
    let (ar, ma) = coeffs.split_at(config.p);
    Ok((ar.to_vec(), ma.to_vec()))
}

/// Reciprocal of a lone MA coefficient outside the unit circle
fn reflect_ma(mut ma: Vec<f64>) -> Vec<f64> {
    if let [theta] = ma.as_mut_slice() {
        if theta.is_finite() && theta.abs() > 1.0 {
            *theta = 1.0 / *theta;
        }
    }
    ma
}

/// AR stationarity and MA invertibility
fn check_polynomials(ar: &[f64], ma: &[f64]) -> Result<(), ForecastError> {
    if !is_stable(ar) {
        return Err(ForecastError::non_convergence(MODEL_NAME, "AR polynomial is not stationary"));
    }
    let negated_ma: Vec<f64> = ma.iter().map(|t| -t).collect();
    if !is_stable(&negated_ma) {
        return Err(ForecastError::non_convergence(MODEL_NAME, "MA polynomial is not invertible"));
    }
    Ok(())
}

/// Stationarity of `1 - Σ φ_j B^j` via the step-down (reverse Levinson) test
///
/// All reflection coefficients must lie strictly inside the unit interval.
pub(crate) fn is_stable(coeffs: &[f64]) -> bool {
    let mut a = coeffs.to_vec();
    while let Some(&kappa) = a.last() {
        if !kappa.is_finite() || kappa.abs() >= 1.0 {
            return false;
        }
        let k = a.len() - 1;
        let denom = 1.0 - kappa * kappa;
        let reduced: Vec<f64> = (0..k).map(|j| (a[j] + kappa * a[k - 1 - j]) / denom).collect();
        a = reduced;
    }
    true
}

//! Predictor registry
//!
//! A closed catalogue of forecasting strategies behind one fit/forecast
//! contract. `PredictorSpec` names a variant and carries its configuration;
//! fitting produces a `FittedModel` that forecasts and reports its in-sample
//! curve.

mod arima;
mod features;
mod holt_winters;
mod linalg;
pub mod lstm;
mod naive;
mod polynomial;

pub use arima::{ArimaConfig, ArimaModel};
pub use features::{linear_regression_slope, mean, sliding_samples, MinMaxScaler, Sample};
pub use holt_winters::{HoltWintersConfig, HoltWintersModel, Smoothing};
pub use lstm::{Lookahead, LstmConfig, LstmModel, StatePolicy};
pub use naive::NaiveModel;
pub use polynomial::{PolynomialConfig, PolynomialModel};

use crate::error::{ConfigurationError, ForecastError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the meta-selector that expands to the whole catalogue
pub const ALL_PREDICTORS: &str = "All";

/// Shared behaviour of fitted models
pub trait Forecaster: Send + Sync {
    /// Predict `horizon` values following the training prefix
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError>;

    /// One-step in-sample predictions over the training prefix
    ///
    /// Same length as the prefix; `None` where the model has no prediction.
    fn fitted_curve(&self) -> Vec<Option<f64>>;
}

/// Per-fit parameters that are not part of a variant's configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitContext {
    /// Steps the model will be asked to forecast
    pub horizon: usize,
    /// RNG seed for stochastic training
    pub seed: u64,
}

/// A catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PredictorSpec {
    Naive,
    Polynomial(PolynomialConfig),
    Arima(ArimaConfig),
    HoltWinters(HoltWintersConfig),
    Lstm(LstmConfig),
}

const CATALOGUE: [PredictorSpec; 12] = [
    PredictorSpec::Naive,
    PredictorSpec::Polynomial(PolynomialConfig { degree: 1 }),
    PredictorSpec::Polynomial(PolynomialConfig { degree: 2 }),
    PredictorSpec::Polynomial(PolynomialConfig { degree: 3 }),
    PredictorSpec::Arima(ArimaConfig { p: 1, d: 1, q: 1 }),
    PredictorSpec::HoltWinters(HoltWintersConfig {
        season_length: 4,
        max_iterations: 50,
    }),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::MultiLookAhead, StatePolicy::Stateful)),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::MultiLookAhead, StatePolicy::Stateless)),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::OneLookAhead, StatePolicy::Stateful)),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::OneLookAhead, StatePolicy::Stateless)),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::MultiModel, StatePolicy::Stateful)),
    PredictorSpec::Lstm(LstmConfig::new(Lookahead::MultiModel, StatePolicy::Stateless)),
];

/// Short names accepted alongside the catalogue names
const ALIASES: [(&str, usize); 6] = [
    ("LSTM-multiLA-stateful", 7),
    ("LSTM-multiLA-stateless", 8),
    ("LSTM-1LA-stateful", 9),
    ("LSTM-1LA-stateless", 10),
    ("LSTM-multiM-1LA-stateful", 11),
    ("LSTM-multiM-1LA-stateless", 12),
];

impl PredictorSpec {
    /// Every concrete variant, in catalogue order
    pub fn all() -> &'static [PredictorSpec] {
        &CATALOGUE
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Naive => "Naive",
            Self::Polynomial(config) => polynomial::polynomial_name(config.degree),
            Self::Arima(_) => "ARIMA",
            Self::HoltWinters(_) => "Holt-Winters",
            Self::Lstm(config) => config.name(),
        }
    }

    /// Stable numeric code: 1-based catalogue position
    pub fn code(&self) -> usize {
        CATALOGUE
            .iter()
            .position(|spec| spec == self)
            .map_or(0, |idx| idx + 1)
    }

    /// Resolve a numeric code; 0 selects the whole catalogue
    pub fn from_code(code: usize) -> Result<Vec<Self>, ConfigurationError> {
        match code {
            0 => Ok(CATALOGUE.to_vec()),
            c if c <= CATALOGUE.len() => Ok(vec![CATALOGUE[c - 1]]),
            c => Err(ConfigurationError::UnknownPredictorCode(c)),
        }
    }

    /// Resolve a name, alias, or numeric code
    pub fn resolve(selector: &str) -> Result<Vec<Self>, ConfigurationError> {
        let selector = selector.trim();
        if let Ok(code) = selector.parse::<usize>() {
            return Self::from_code(code);
        }
        if selector.eq_ignore_ascii_case(ALL_PREDICTORS) {
            return Ok(CATALOGUE.to_vec());
        }
        selector.parse().map(|spec| vec![spec])
    }

    /// Resolve a list of selectors, dropping duplicates but keeping first-seen order
    pub fn resolve_many<I, S>(selectors: I) -> Result<Vec<Self>, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut specs: Vec<Self> = Vec::new();
        for selector in selectors {
            for spec in Self::resolve(selector.as_ref())? {
                if !specs.contains(&spec) {
                    specs.push(spec);
                }
            }
        }
        if specs.is_empty() {
            return Err(ConfigurationError::NoPredictors);
        }
        Ok(specs)
    }

    /// Cells whose training must run as one in-order unit
    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Lstm(config) if config.is_stateful())
    }

    /// Fit this variant on a training prefix
    pub fn fit(&self, train: &[f64], ctx: &FitContext) -> Result<FittedModel, ForecastError> {
        match self {
            Self::Naive => NaiveModel::fit(train).map(FittedModel::Naive),
            Self::Polynomial(config) => PolynomialModel::fit(config, train).map(FittedModel::Polynomial),
            Self::Arima(config) => ArimaModel::fit(config, train).map(FittedModel::Arima),
            Self::HoltWinters(config) => {
                HoltWintersModel::fit(config, train).map(FittedModel::HoltWinters)
            }
            Self::Lstm(config) => LstmModel::fit(config, train, ctx).map(FittedModel::Lstm),
        }
    }
}

impl fmt::Display for PredictorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PredictorSpec {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Some(spec) = CATALOGUE.iter().find(|spec| spec.name().eq_ignore_ascii_case(name)) {
            return Ok(*spec);
        }
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|&(_, code)| CATALOGUE[code - 1])
            .ok_or_else(|| ConfigurationError::UnknownPredictor(name.to_string()))
    }
}

impl TryFrom<String> for PredictorSpec {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PredictorSpec> for String {
    fn from(spec: PredictorSpec) -> Self {
        spec.name().to_string()
    }
}

/// A model fitted by one of the catalogue variants
#[derive(Debug, Clone)]
pub enum FittedModel {
    Naive(NaiveModel),
    Polynomial(PolynomialModel),
    Arima(ArimaModel),
    HoltWinters(HoltWintersModel),
    Lstm(LstmModel),
}

impl Forecaster for FittedModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        match self {
            Self::Naive(m) => m.forecast(horizon),
            Self::Polynomial(m) => m.forecast(horizon),
            Self::Arima(m) => m.forecast(horizon),
            Self::HoltWinters(m) => m.forecast(horizon),
            Self::Lstm(m) => m.forecast(horizon),
        }
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        match self {
            Self::Naive(m) => m.fitted_curve(),
            Self::Polynomial(m) => m.fitted_curve(),
            Self::Arima(m) => m.fitted_curve(),
            Self::HoltWinters(m) => m.fitted_curve(),
            Self::Lstm(m) => m.fitted_curve(),
        }
    }
}

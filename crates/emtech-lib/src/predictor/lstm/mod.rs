//! Recurrent sequence predictors
//!
//! One LSTM implementation covers the six catalogue variants. Two axes vary
//! independently: whether the recurrent state survives from one training
//! window to the next, and how the forecast horizon is produced.

mod network;

pub use network::{Adam, LstmNetwork, LstmState};

use super::features::{sliding_samples, MinMaxScaler, Sample};
use super::{FitContext, Forecaster};
use crate::error::ForecastError;
use network::clip_gradient;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_WINDOW: usize = 4;
pub const DEFAULT_HIDDEN: usize = 8;
pub const DEFAULT_EPOCHS: usize = 100;
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Recurrent-state retention across training windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatePolicy {
    /// State carries over between consecutive windows, in time order
    Stateful,
    /// State resets for every window
    Stateless,
}

/// How the forecast horizon is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookahead {
    /// One output per horizon step from a single model
    MultiLookAhead,
    /// One-step model applied recursively
    OneLookAhead,
    /// One single-output model per horizon step
    MultiModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstmConfig {
    pub lookahead: Lookahead,
    pub state: StatePolicy,
    pub window: usize,
    pub hidden: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
}

impl LstmConfig {
    pub const fn new(lookahead: Lookahead, state: StatePolicy) -> Self {
        Self {
            lookahead,
            state,
            window: DEFAULT_WINDOW,
            hidden: DEFAULT_HIDDEN,
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn is_stateful(&self) -> bool {
        self.state == StatePolicy::Stateful
    }

    pub fn name(&self) -> &'static str {
        match (self.lookahead, self.state) {
            (Lookahead::MultiLookAhead, StatePolicy::Stateful) => "LSTM-multiLookAhead-stateful",
            (Lookahead::MultiLookAhead, StatePolicy::Stateless) => "LSTM-multiLookAhead-stateless",
            (Lookahead::OneLookAhead, StatePolicy::Stateful) => "LSTM-1LookAhead-stateful",
            (Lookahead::OneLookAhead, StatePolicy::Stateless) => "LSTM-1LookAhead-stateless",
            (Lookahead::MultiModel, StatePolicy::Stateful) => "LSTM-multiModel-1LookAhead-stateful",
            (Lookahead::MultiModel, StatePolicy::Stateless) => {
                "LSTM-multiModel-1LookAhead-stateless"
            }
        }
    }

    /// Shortest training prefix for a horizon
    pub fn min_observations(&self, horizon: usize) -> usize {
        match self.lookahead {
            Lookahead::OneLookAhead => self.window + 1,
            Lookahead::MultiLookAhead | Lookahead::MultiModel => self.window + horizon.max(1),
        }
    }
}

/// A trained network plus the state it forecasts from
#[derive(Debug, Clone)]
struct Member {
    network: LstmNetwork,
    forecast_state: LstmState,
}

/// Fitted LSTM predictor
#[derive(Debug, Clone)]
pub struct LstmModel {
    config: LstmConfig,
    scaler: MinMaxScaler,
    scaled: Vec<f64>,
    members: Vec<Member>,
}

impl LstmModel {
    pub fn fit(config: &LstmConfig, train: &[f64], ctx: &FitContext) -> Result<Self, ForecastError> {
        let required = config.min_observations(ctx.horizon);
        if train.len() < required {
            return Err(ForecastError::insufficient(required, train.len()));
        }
        if train.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::non_convergence(config.name(), "non-finite input"));
        }

        let scaler = MinMaxScaler::fit(train);
        let scaled = scaler.scale_all(train);

        let members = match config.lookahead {
            Lookahead::MultiLookAhead => {
                let samples = sliding_samples(&scaled, config.window, ctx.horizon, 0);
                vec![train_member(config, &samples, &scaled, ctx.horizon, ctx.seed)?]
            }
            Lookahead::OneLookAhead => {
                let samples = sliding_samples(&scaled, config.window, 1, 0);
                vec![train_member(config, &samples, &scaled, 1, ctx.seed)?]
            }
            Lookahead::MultiModel => (0..ctx.horizon)
                .map(|k| {
                    let samples = sliding_samples(&scaled, config.window, 1, k);
                    train_member(config, &samples, &scaled, 1, ctx.seed.wrapping_add(k as u64))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        debug!(
            predictor = config.name(),
            members = members.len(),
            observations = train.len(),
            "LSTM trained"
        );

        Ok(Self {
            config: *config,
            scaler,
            scaled,
            members,
        })
    }

    fn last_window(&self) -> &[f64] {
        &self.scaled[self.scaled.len() - self.config.window..]
    }

    fn finish(&self, scaled: Vec<f64>) -> Result<Vec<f64>, ForecastError> {
        let values: Vec<f64> = scaled.into_iter().map(|v| self.scaler.inverse(v)).collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::non_convergence(
                self.config.name(),
                "forecast is not finite",
            ));
        }
        Ok(values)
    }
}

impl Forecaster for LstmModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let window = self.last_window();
        let scaled = match self.config.lookahead {
            Lookahead::MultiLookAhead => {
                let member = &self.members[0];
                if horizon > member.network.outputs() {
                    return Err(ForecastError::insufficient(
                        self.config.window + horizon,
                        self.scaled.len(),
                    ));
                }
                let (out, _) = member.network.forward(window, &member.forecast_state);
                out[..horizon].to_vec()
            }
            Lookahead::OneLookAhead => {
                let member = &self.members[0];
                let mut inputs = window.to_vec();
                let mut state = member.forecast_state.clone();
                let mut out = Vec::with_capacity(horizon);
                for _ in 0..horizon {
                    let (y, next) = member.network.forward(&inputs, &state);
                    if self.config.is_stateful() {
                        state = next;
                    }
                    out.push(y[0]);
                    inputs.remove(0);
                    inputs.push(y[0]);
                }
                out
            }
            Lookahead::MultiModel => {
                if horizon > self.members.len() {
                    return Err(ForecastError::insufficient(
                        self.config.window + horizon,
                        self.scaled.len(),
                    ));
                }
                self.members[..horizon]
                    .iter()
                    .map(|m| m.network.forward(window, &m.forecast_state).0[0])
                    .collect()
            }
        };
        self.finish(scaled)
    }

    fn fitted_curve(&self) -> Vec<Option<f64>> {
        let member = &self.members[0];
        let w = self.config.window;
        let mut curve = vec![None; w.min(self.scaled.len())];
        let mut state = LstmState::zeros(member.network.hidden());
        for start in 0..self.scaled.len().saturating_sub(w) {
            let (y, next) = member.network.forward(&self.scaled[start..start + w], &state);
            if self.config.is_stateful() {
                state = next;
            }
            let value = self.scaler.inverse(y[0]);
            curve.push(value.is_finite().then_some(value));
        }
        curve
    }
}

fn train_member(
    config: &LstmConfig,
    samples: &[Sample],
    scaled: &[f64],
    outputs: usize,
    seed: u64,
) -> Result<Member, ForecastError> {
    if samples.is_empty() {
        return Err(ForecastError::insufficient(
            config.min_observations(outputs),
            scaled.len(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut network = LstmNetwork::new(config.hidden, outputs, &mut rng);
    let mut adam = Adam::new(network.param_len(), config.learning_rate);

    let mut loss = f64::NAN;
    match config.state {
        StatePolicy::Stateful => {
            for _ in 0..config.epochs {
                let mut state = LstmState::zeros(config.hidden);
                let mut total = 0.0;
                for sample in samples {
                    let mut step = network.gradient(&sample.input, &sample.target, &state);
                    clip_gradient(&mut step.grad);
                    adam.step(network.params_mut(), &step.grad);
                    total += step.loss;
                    state = step.final_state;
                }
                loss = total / samples.len() as f64;
            }
        }
        StatePolicy::Stateless => {
            let zero = LstmState::zeros(config.hidden);
            let mut order: Vec<usize> = (0..samples.len()).collect();
            for _ in 0..config.epochs {
                order.shuffle(&mut rng);
                let mut total = 0.0;
                for batch in order.chunks(config.batch_size.max(1)) {
                    let grads: Vec<_> = batch
                        .par_iter()
                        .map(|&idx| network.gradient(&samples[idx].input, &samples[idx].target, &zero))
                        .collect();
                    let mut sum = vec![0.0; network.param_len()];
                    for g in &grads {
                        for (s, v) in sum.iter_mut().zip(&g.grad) {
                            *s += v;
                        }
                        total += g.loss;
                    }
                    let n = grads.len() as f64;
                    sum.iter_mut().for_each(|s| *s /= n);
                    clip_gradient(&mut sum);
                    adam.step(network.params_mut(), &sum);
                }
                loss = total / samples.len() as f64;
            }
        }
    }

    if !loss.is_finite() {
        return Err(ForecastError::non_convergence(config.name(), "training loss diverged"));
    }

    let forecast_state = match config.state {
        StatePolicy::Stateless => LstmState::zeros(config.hidden),
        StatePolicy::Stateful => warm_state(&network, scaled, config.window),
    };

    Ok(Member {
        network,
        forecast_state,
    })
}

/// State after consuming every window that precedes the final one
fn warm_state(network: &LstmNetwork, scaled: &[f64], window: usize) -> LstmState {
    let mut state = LstmState::zeros(network.hidden());
    for start in 0..scaled.len().saturating_sub(window) {
        state = network.forward(&scaled[start..start + window], &state).1;
    }
    state
}

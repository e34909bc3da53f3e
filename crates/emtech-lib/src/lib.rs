//! Term emergence forecasting engine
//!
//! This crate provides the core functionality for:
//! - Extracting per-term quarterly series from a term-count matrix
//! - Classifying terms as emergent, stationary, or declining
//! - Forecasting term counts with a catalogue of predictors
//! - Train/test evaluation on a bounded worker pool
//! - Metrics and structured run logging

pub mod config;
pub mod emergence;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod predictor;
pub mod series;

pub use config::EngineConfig;
pub use emergence::{Classification, EmergenceClassifier};
pub use error::{ConfigurationError, EngineError, FailureReason, ForecastError, MatrixError};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use orchestrator::{EvaluationRun, ForecastEngine, RunReport, RunSettings};
pub use predictor::{Forecaster, PredictorSpec};
pub use series::{Quarter, SeriesExtractor, TermCountMatrix};

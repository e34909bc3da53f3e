//! Train/test evaluation and forecast accuracy metrics

mod harness;
pub mod metrics;

pub use harness::{EvaluationHarness, HarnessOptions, MIN_TRAIN_POINTS};

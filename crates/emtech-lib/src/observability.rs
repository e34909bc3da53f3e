//! Observability infrastructure for forecasting runs
//!
//! Provides:
//! - Prometheus metrics (cell outcomes, fit latency, classified terms, runs)
//! - Structured logging of run-level events with tracing

use crate::error::FailureReason;
use crate::models::EmergenceLabel;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for fit latency (in seconds)
const FIT_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    cells_total: IntCounterVec,
    fit_duration_seconds: HistogramVec,
    terms_classified_total: IntCounterVec,
    runs_total: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            cells_total: register_int_counter_vec!(
                "emtech_cells_total",
                "Evaluation cells by predictor and outcome",
                &["predictor", "status"]
            )
            .expect("Failed to register emtech_cells_total"),

            fit_duration_seconds: register_histogram_vec!(
                "emtech_fit_duration_seconds",
                "Time spent fitting and forecasting one cell",
                &["predictor"],
                FIT_BUCKETS.to_vec()
            )
            .expect("Failed to register emtech_fit_duration_seconds"),

            terms_classified_total: register_int_counter_vec!(
                "emtech_terms_classified_total",
                "Terms classified by emergence label",
                &["label"]
            )
            .expect("Failed to register emtech_terms_classified_total"),

            runs_total: register_int_counter!(
                "emtech_runs_total",
                "Completed forecasting runs"
            )
            .expect("Failed to register emtech_runs_total"),
        }
    }
}

/// Handle to the process-wide engine metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    inner: &'static EngineMetricsInner,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(EngineMetricsInner::new),
        }
    }

    /// Record one finished cell
    pub fn observe_cell(&self, predictor: &str, failure: Option<FailureReason>, duration_secs: f64) {
        let status = failure.map_or("completed", |r| r.as_str());
        self.inner
            .cells_total
            .with_label_values(&[predictor, status])
            .inc();
        self.inner
            .fit_duration_seconds
            .with_label_values(&[predictor])
            .observe(duration_secs);
    }

    pub fn inc_terms_classified(&self, label: EmergenceLabel) {
        self.inner
            .terms_classified_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn inc_runs(&self) {
        self.inner.runs_total.inc();
    }

    pub fn cells_total(&self, predictor: &str, status: &str) -> u64 {
        self.inner
            .cells_total
            .with_label_values(&[predictor, status])
            .get()
    }

    pub fn runs_total(&self) -> u64 {
        self.inner.runs_total.get()
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for run events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    run_id: String,
}

impl StructuredLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_run_started(&self, terms: usize, predictors: usize, labels: usize, train_test: bool) {
        info!(
            event = "run_started",
            run_id = %self.run_id,
            terms = terms,
            predictors = predictors,
            labels = labels,
            train_test = train_test,
            "Forecasting run started"
        );
    }

    pub fn log_term_classified(&self, term: &str, label: EmergenceLabel, score: f64) {
        info!(
            event = "term_classified",
            run_id = %self.run_id,
            term = %term,
            label = %label,
            score = score,
            "Term classified"
        );
    }

    pub fn log_cell_failed(&self, term: &str, predictor: &str, reason: FailureReason, message: &str) {
        warn!(
            event = "cell_failed",
            run_id = %self.run_id,
            term = %term,
            predictor = %predictor,
            reason = %reason,
            message = %message,
            "Evaluation cell failed"
        );
    }

    pub fn log_run_completed(&self, completed: usize, failed: usize, elapsed_ms: u64) {
        info!(
            event = "run_completed",
            run_id = %self.run_id,
            completed = completed,
            failed = failed,
            elapsed_ms = elapsed_ms,
            "Forecasting run completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_state() {
        let a = EngineMetrics::new();
        let b = a.clone();
        let before = b.cells_total("test-predictor", "completed");
        a.observe_cell("test-predictor", None, 0.01);
        assert_eq!(b.cells_total("test-predictor", "completed"), before + 1);
    }

    #[test]
    fn test_failed_cells_labelled_by_reason() {
        let metrics = EngineMetrics::new();
        let before = metrics.cells_total("test-failing", "non_convergence");
        metrics.observe_cell("test-failing", Some(FailureReason::NonConvergence), 0.5);
        assert_eq!(metrics.cells_total("test-failing", "non_convergence"), before + 1);
    }

    #[test]
    fn test_render_exposition() {
        let metrics = EngineMetrics::new();
        metrics.inc_runs();
        let text = metrics.render().unwrap();
        assert!(text.contains("emtech_runs_total"));
    }
}

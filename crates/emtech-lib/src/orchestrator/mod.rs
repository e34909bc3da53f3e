//! Run orchestration
//!
//! Extracts series, classifies terms, selects the top terms per requested
//! label (or the requested terms when no label filter is set), evaluates
//! every (term, predictor) cell on the worker pool, and groups the results
//! into a report.

mod report;
mod run;
mod scheduler;

pub use report::{report_title, ErrorSummary, LabelSection, PredictorGroup, RunReport};
pub use run::{EvaluationRun, RunSettings, DEFAULT_NTERMS, DEFAULT_STEPS_AHEAD};
pub use scheduler::{Cell, CellScheduler};

use crate::config::EngineConfig;
use crate::emergence::{rank_terms, Classification, EmergenceClassifier};
use crate::error::{ConfigurationError, Result};
use crate::evaluation::EvaluationHarness;
use crate::models::{CellStatus, EmergenceLabel, ForecastResult, TimeSeries};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::series::{SeriesExtractor, TermCountMatrix};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Entry point for classification and forecasting runs
pub struct ForecastEngine {
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl ForecastEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: EngineMetrics::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Classify every term that reaches `min_per_bucket` in some quarter
    pub fn classify(
        &self,
        matrix: &TermCountMatrix,
        min_per_bucket: u64,
        normalized: bool,
    ) -> Vec<Classification> {
        let series = SeriesExtractor::new(min_per_bucket)
            .normalized(normalized)
            .extract(matrix);
        let classifications = EmergenceClassifier::new(min_per_bucket).classify_all(&series);
        for c in &classifications {
            self.metrics.inc_terms_classified(c.label);
        }
        classifications
    }

    /// Execute a validated run over `matrix`
    pub async fn run(&self, matrix: &TermCountMatrix, run: &EvaluationRun) -> Result<RunReport> {
        let started = Instant::now();
        let generated_at = Utc::now();
        let logger =
            StructuredLogger::new(format!("run-{}", generated_at.format("%Y%m%dT%H%M%S%.3f")));
        let harness = EvaluationHarness::new(run.harness_options(self.config.seed))?;

        if let Some(terms) = run.terms() {
            if let Some(missing) = terms
                .iter()
                .find(|t| !matrix.terms().iter().any(|row| &row.term == *t))
            {
                return Err(ConfigurationError::UnknownTerm(missing.clone()).into());
            }
        }

        let series: HashMap<String, Arc<TimeSeries>> = SeriesExtractor::new(run.min_per_bucket())
            .normalized(run.normalized())
            .extract(matrix)
            .into_iter()
            .map(|s| (s.term().to_string(), Arc::new(s)))
            .collect();

        // requested terms that survived extraction
        let requested: Option<Vec<String>> = run.terms().map(|terms| {
            terms
                .iter()
                .filter(|t| {
                    let kept = series.contains_key(*t);
                    if !kept {
                        warn!(
                            term = %t,
                            min_per_bucket = run.min_per_bucket(),
                            "Requested term never reaches the minimum count"
                        );
                    }
                    kept
                })
                .cloned()
                .collect()
        });

        let classifier = EmergenceClassifier::new(run.min_per_bucket());
        let mut classifications: Vec<Classification> = series
            .values()
            .filter_map(|s| classifier.classify(s))
            .collect();
        classifications.sort_by(|a, b| a.term.cmp(&b.term));
        for c in &classifications {
            self.metrics.inc_terms_classified(c.label);
            logger.log_term_classified(&c.term, c.label, c.score);
        }

        let selections: Vec<(Option<EmergenceLabel>, Vec<String>)> = if run.is_label_filtered() {
            let eligible: Vec<Classification> = match &requested {
                Some(terms) => classifications
                    .iter()
                    .filter(|c| terms.contains(&c.term))
                    .cloned()
                    .collect(),
                None => classifications.clone(),
            };
            run.labels()
                .iter()
                .map(|&label| {
                    let terms = rank_terms(&eligible, label, run.nterms())
                        .into_iter()
                        .map(|c| c.term)
                        .collect();
                    (Some(label), terms)
                })
                .collect()
        } else {
            let terms = match &requested {
                Some(terms) => terms.clone(),
                None => {
                    let mut all: Vec<String> = series.keys().cloned().collect();
                    all.sort();
                    all.truncate(run.nterms());
                    all
                }
            };
            vec![(None, terms)]
        };

        let label_of: HashMap<&str, EmergenceLabel> = classifications
            .iter()
            .map(|c| (c.term.as_str(), c.label))
            .collect();

        // per section: cells in (predictor, term) order
        let mut cells = Vec::new();
        for (label, terms) in &selections {
            for spec in run.predictors() {
                for term in terms {
                    if let Some(s) = series.get(term) {
                        cells.push(Cell {
                            series: Arc::clone(s),
                            spec: *spec,
                            label: label.or_else(|| label_of.get(term.as_str()).copied()),
                        });
                    }
                }
            }
        }

        let term_count: usize = selections.iter().map(|(_, t)| t.len()).sum();
        logger.log_run_started(
            term_count,
            run.predictors().len(),
            run.labels().len(),
            run.train_test(),
        );

        let scheduler = CellScheduler::new(harness, self.config.max_workers);
        let results = scheduler.run(&cells).await;
        self.record(&logger, &results);

        let mut remaining = results.into_iter();
        let sections = selections
            .into_iter()
            .map(|(label, terms)| {
                let groups = run
                    .predictors()
                    .iter()
                    .map(|spec| {
                        let results: Vec<ForecastResult> =
                            remaining.by_ref().take(terms.len()).collect();
                        PredictorGroup {
                            predictor: spec.name().to_string(),
                            summary: ErrorSummary::from_results(&results),
                            results,
                        }
                    })
                    .collect();
                LabelSection {
                    label,
                    title: report_title(run.train_test(), run.normalized(), label),
                    terms,
                    groups,
                }
            })
            .collect();

        let report = RunReport {
            run_id: logger.run_id().to_string(),
            generated_at,
            train_test: run.train_test(),
            normalized: run.normalized(),
            horizon: run.horizon(),
            classifications,
            sections,
        };

        self.metrics.inc_runs();
        logger.log_run_completed(
            report.completed(),
            report.failed(),
            started.elapsed().as_millis() as u64,
        );
        Ok(report)
    }

    fn record(&self, logger: &StructuredLogger, results: &[ForecastResult]) {
        for result in results {
            let failure = result.failure_reason();
            self.metrics.observe_cell(
                &result.predictor,
                failure,
                result.duration_us as f64 / 1_000_000.0,
            );
            if let CellStatus::Failed { reason, message } = &result.status {
                logger.log_cell_failed(&result.term, &result.predictor, *reason, message);
            }
        }
    }
}

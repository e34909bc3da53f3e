//! Bounded worker pool for the (term × predictor) grid
//!
//! Every cell is one blocking task. A semaphore caps how many run at once.
//! Results are written back by cell index, so output order is grid order
//! whatever order the workers finish in.

use crate::error::FailureReason;
use crate::evaluation::EvaluationHarness;
use crate::models::{EmergenceLabel, ForecastResult, TimeSeries};
use crate::predictor::PredictorSpec;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// One (term, predictor) evaluation
#[derive(Debug, Clone)]
pub struct Cell {
    pub series: Arc<TimeSeries>,
    pub spec: PredictorSpec,
    pub label: Option<EmergenceLabel>,
}

pub struct CellScheduler {
    harness: Arc<EvaluationHarness>,
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl CellScheduler {
    pub fn new(harness: EvaluationHarness, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            harness: Arc::new(harness),
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Evaluate every cell; the returned vector is index-aligned with `cells`
    pub async fn run(&self, cells: &[Cell]) -> Vec<ForecastResult> {
        let harness = Arc::clone(&self.harness);
        self.run_with(cells, move |series, spec| harness.evaluate(series, spec))
            .await
    }

    async fn run_with<F>(&self, cells: &[Cell], evaluate: F) -> Vec<ForecastResult>
    where
        F: Fn(&TimeSeries, &PredictorSpec) -> ForecastResult + Send + Sync + 'static,
    {
        let evaluate = Arc::new(evaluate);
        let mut slots: Vec<Option<ForecastResult>> = vec![None; cells.len()];

        // stateful recurrent cells are the longest serial units; start them first
        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_by_key(|&idx| !cells[idx].spec.is_sequential());

        let mut tasks = JoinSet::new();
        for idx in order {
            let cell = cells[idx].clone();
            let evaluate = Arc::clone(&evaluate);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        let series = Arc::clone(&cell.series);
                        let spec = cell.spec;
                        tokio::task::spawn_blocking(move || evaluate(series.as_ref(), &spec))
                            .await
                            .map_err(|e| e.to_string())
                    }
                    Err(e) => Err(e.to_string()),
                };
                (idx, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(result))) => slots[idx] = Some(result),
                Ok((idx, Err(message))) => {
                    warn!(
                        term = cells[idx].series.term(),
                        predictor = cells[idx].spec.name(),
                        reason = %FailureReason::WorkerFailure,
                        "Worker failed: {}",
                        message
                    );
                    slots[idx] = Some(worker_failure(&cells[idx], message));
                }
                // the slot stays empty and is filled below
                Err(e) => warn!(error = %e, "Cell task failed"),
            }
        }

        debug!(cells = cells.len(), max_workers = self.max_workers, "Grid evaluated");

        slots
            .into_iter()
            .zip(cells)
            .map(|(slot, cell)| {
                let result =
                    slot.unwrap_or_else(|| worker_failure(cell, "task did not complete".to_string()));
                result.with_label(cell.label)
            })
            .collect()
    }
}

fn worker_failure(cell: &Cell, message: String) -> ForecastResult {
    ForecastResult::failed(
        cell.series.term(),
        cell.spec.name(),
        FailureReason::WorkerFailure,
        message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::HarnessOptions;
    use crate::series::Quarter;

    fn harness(horizon: usize) -> EvaluationHarness {
        EvaluationHarness::new(HarnessOptions {
            horizon,
            train_test: true,
            curves: false,
            seed: 1,
        })
        .unwrap()
    }

    fn cell(term: &str, counts: &[u64], predictor: &str) -> Cell {
        Cell {
            series: Arc::new(TimeSeries::from_counts(
                term,
                Quarter::new(2017, 1).unwrap(),
                counts,
            )),
            spec: PredictorSpec::resolve(predictor).unwrap()[0],
            label: Some(EmergenceLabel::Emergent),
        }
    }

    #[tokio::test]
    async fn test_results_follow_grid_order() {
        let cells: Vec<Cell> = (0..20)
            .map(|i| {
                let counts: Vec<u64> = (0..8).map(|j| (i * 10 + j) as u64).collect();
                cell(&format!("term-{:02}", i), &counts, if i % 2 == 0 { "Naive" } else { "Cubic" })
            })
            .collect();
        let scheduler = CellScheduler::new(harness(2), 3);
        let results = scheduler.run(&cells).await;
        assert_eq!(results.len(), 20);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.term, format!("term-{:02}", i));
            assert_eq!(result.label, Some(EmergenceLabel::Emergent));
        }
    }

    #[tokio::test]
    async fn test_failing_cell_isolated() {
        let cells = vec![
            cell("long", &[1, 2, 3, 4, 5, 6, 7, 8], "Naive"),
            cell("short", &[1, 2, 3], "Naive"),
            cell("other", &[5, 5, 6, 6, 7, 7], "Linear"),
        ];
        let results = CellScheduler::new(harness(2), 2).run(&cells).await;
        assert!(results[0].is_completed());
        assert_eq!(results[1].failure_reason(), Some(FailureReason::DataInsufficiency));
        assert!(results[2].is_completed());
    }

    #[tokio::test]
    async fn test_panicking_worker_recorded() {
        let cells = vec![
            cell("steady", &[1, 2, 3, 4, 5], "Naive"),
            cell("explodes", &[1, 2, 3, 4, 5], "Naive"),
            cell("other", &[5, 4, 3, 2, 1], "Linear"),
        ];
        let scheduler = CellScheduler::new(harness(1), 2);
        let inner = harness(1);
        let results = scheduler
            .run_with(&cells, move |series, spec| {
                if series.term() == "explodes" {
                    panic!("fit blew up");
                }
                inner.evaluate(series, spec)
            })
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_completed());
        assert!(results[2].is_completed());
        assert_eq!(results[1].term, "explodes");
        assert_eq!(results[1].predictor, "Naive");
        assert_eq!(results[1].failure_reason(), Some(FailureReason::WorkerFailure));
        assert_eq!(results[1].label, Some(EmergenceLabel::Emergent));
        assert!(results[1].forecast.is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_clamped() {
        let scheduler = CellScheduler::new(harness(1), 0);
        assert_eq!(scheduler.max_workers(), 1);
        let results = scheduler.run(&[cell("a", &[1, 2, 3, 4], "Naive")]).await;
        assert!(results[0].is_completed());
    }
}

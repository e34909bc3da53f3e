//! Per-term series extraction
//!
//! Slices the term-count matrix into one ordered series per term, dropping
//! terms that never reach the minimum count in any quarter, and optionally
//! normalizing by total corpus activity per quarter.

use super::TermCountMatrix;
use crate::models::{SeriesPoint, TimeSeries};
use tracing::debug;

/// Default minimum number of occurrences per quarter
pub const DEFAULT_MIN_PER_BUCKET: u64 = 20;

/// Extracts term time series from a count matrix
#[derive(Debug, Clone)]
pub struct SeriesExtractor {
    min_per_bucket: u64,
    normalize: bool,
}

impl SeriesExtractor {
    pub fn new(min_per_bucket: u64) -> Self {
        Self {
            min_per_bucket,
            normalize: false,
        }
    }

    pub fn normalized(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn min_per_bucket(&self) -> u64 {
        self.min_per_bucket
    }

    /// Extract one series per term that reaches the threshold at least once
    pub fn extract(&self, matrix: &TermCountMatrix) -> Vec<TimeSeries> {
        let totals = self.normalize.then(|| matrix.bucket_totals());
        let quarters = matrix.quarters();

        let series: Vec<TimeSeries> = matrix
            .terms()
            .iter()
            .filter(|row| row.counts.iter().any(|&c| c >= self.min_per_bucket))
            .map(|row| {
                let points = quarters
                    .iter()
                    .zip(&row.counts)
                    .enumerate()
                    .map(|(i, (&quarter, &count))| SeriesPoint {
                        quarter,
                        count,
                        value: match &totals {
                            Some(totals) => normalize_count(count, totals[i]),
                            None => count as f64,
                        },
                    })
                    .collect();
                // matrix quarters are already validated as contiguous
                TimeSeries::from_contiguous(row.term.clone(), points, self.normalize)
            })
            .collect();

        debug!(
            terms_in = matrix.num_terms(),
            terms_out = series.len(),
            min_per_bucket = self.min_per_bucket,
            normalized = self.normalize,
            "Extracted term series"
        );
        series
    }
}

impl Default for SeriesExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PER_BUCKET)
    }
}

/// Share of corpus activity; zero-activity buckets normalize to zero
fn normalize_count(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

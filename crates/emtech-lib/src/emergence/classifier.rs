//! Trend labelling from slope and recency heuristics
//!
//! The last `RECENT_WINDOW` quarters are compared against everything before
//! them. The emergence score is the shift in mean between the two windows,
//! relative to the mean of the whole series.

use crate::models::{EmergenceLabel, TimeSeries};
use crate::predictor::{linear_regression_slope, mean};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Quarters forming the recent window
pub const RECENT_WINDOW: usize = 3;

/// Minimum relative rise in mean for an emergent label
pub const EMERGENT_SHIFT: f64 = 0.25;

/// Minimum relative fall in mean for a declining label
pub const DECLINING_SHIFT: f64 = 0.05;

/// Label and score for one term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub term: String,
    pub label: EmergenceLabel,
    pub score: f64,
    pub recent_slope: f64,
    pub baseline_slope: f64,
}

/// Labels term series as emergent, stationary, or declining
#[derive(Debug, Clone)]
pub struct EmergenceClassifier {
    /// Raw count a term must reach in at least one quarter
    pub min_per_bucket: u64,
}

impl EmergenceClassifier {
    pub fn new(min_per_bucket: u64) -> Self {
        Self { min_per_bucket }
    }

    /// Classify one series
    ///
    /// # Returns
    /// * `None` if the term never reaches `min_per_bucket` in any quarter
    /// * `Some(Classification)` otherwise
    pub fn classify(&self, series: &TimeSeries) -> Option<Classification> {
        if series.max_count() < self.min_per_bucket {
            return None;
        }

        let values = series.values();
        if values.len() < RECENT_WINDOW + 1 {
            return Some(Classification {
                term: series.term().to_string(),
                label: EmergenceLabel::Stationary,
                score: 0.0,
                recent_slope: 0.0,
                baseline_slope: 0.0,
            });
        }

        let split = values.len() - RECENT_WINDOW;
        let (baseline, recent) = values.split_at(split);
        let recent_slope = linear_regression_slope(recent);
        let baseline_slope = linear_regression_slope(baseline);

        let scale = mean(&values);
        let score = if scale.abs() < f64::EPSILON {
            0.0
        } else {
            (mean(recent) - mean(baseline)) / scale
        };

        let recent_max = series.counts()[split..].iter().copied().max().unwrap_or(0);

        let label = if score > EMERGENT_SHIFT
            && recent_slope >= baseline_slope
            && recent_max >= self.min_per_bucket
        {
            EmergenceLabel::Emergent
        } else if score < -DECLINING_SHIFT && recent_slope <= 0.0 {
            EmergenceLabel::Declining
        } else {
            EmergenceLabel::Stationary
        };

        debug!(
            term = series.term(),
            label = %label,
            score,
            recent_slope,
            baseline_slope,
            "Classified term"
        );

        Some(Classification {
            term: series.term().to_string(),
            label,
            score,
            recent_slope,
            baseline_slope,
        })
    }

    /// Classify every series, dropping excluded terms
    pub fn classify_all<'a, I>(&self, series: I) -> Vec<Classification>
    where
        I: IntoIterator<Item = &'a TimeSeries>,
    {
        series.into_iter().filter_map(|s| self.classify(s)).collect()
    }
}

/// Top `nterms` classifications with `label`, strongest signal first
///
/// Emergent terms rank by descending score, declining by ascending score,
/// stationary by ascending absolute score. Ties break by term name.
pub fn rank_terms(
    classifications: &[Classification],
    label: EmergenceLabel,
    nterms: usize,
) -> Vec<Classification> {
    let mut selected: Vec<Classification> = classifications
        .iter()
        .filter(|c| c.label == label)
        .cloned()
        .collect();

    let key = |c: &Classification| match label {
        EmergenceLabel::Emergent => -c.score,
        EmergenceLabel::Declining => c.score,
        EmergenceLabel::Stationary => c.score.abs(),
    };
    selected.sort_by(|a, b| match key(a).total_cmp(&key(b)) {
        Ordering::Equal => a.term.cmp(&b.term),
        other => other,
    });
    selected.truncate(nterms);
    selected
}

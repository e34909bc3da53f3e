//! Presentation-ready run report

use crate::emergence::Classification;
use crate::models::{EmergenceLabel, ForecastResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report heading for one section; unfiltered sections carry no label suffix
pub fn report_title(train_test: bool, normalized: bool, label: Option<EmergenceLabel>) -> String {
    let mut title = String::from(if train_test {
        "Forecasts Evaluation"
    } else {
        "Forecasts"
    });
    if normalized {
        title.push_str(": Normalised Counts");
    }
    if let Some(label) = label {
        title.push_str(&format!(" ({})", label));
    }
    title
}

/// Aggregate errors across the terms of one predictor group
///
/// Means cover completed cells that carry error metrics; they are `None`
/// when there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub mean_mae: Option<f64>,
    pub mean_rmse: Option<f64>,
    pub mean_smape: Option<f64>,
    pub completed: usize,
    pub failed: usize,
}

impl ErrorSummary {
    pub fn from_results(results: &[ForecastResult]) -> Self {
        let completed = results.iter().filter(|r| r.is_completed()).count();
        let errors: Vec<_> = results
            .iter()
            .filter(|r| r.is_completed())
            .filter_map(|r| r.errors)
            .collect();
        let mean_of = |f: fn(&crate::models::ErrorMetrics) -> f64| {
            (!errors.is_empty()).then(|| errors.iter().map(f).sum::<f64>() / errors.len() as f64)
        };
        Self {
            mean_mae: mean_of(|e| e.mae),
            mean_rmse: mean_of(|e| e.rmse),
            mean_smape: mean_of(|e| e.smape),
            completed,
            failed: results.len() - completed,
        }
    }
}

/// Results of one predictor over the terms of a section, in term rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorGroup {
    pub predictor: String,
    pub results: Vec<ForecastResult>,
    pub summary: ErrorSummary,
}

/// Everything reported for one emergence label, or for an unfiltered term set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSection {
    pub label: Option<EmergenceLabel>,
    pub title: String,
    /// Selected terms: strongest signal first under a label, otherwise in
    /// request or name order
    pub terms: Vec<String>,
    pub groups: Vec<PredictorGroup>,
}

/// Output of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub train_test: bool,
    pub normalized: bool,
    pub horizon: usize,
    pub classifications: Vec<Classification>,
    pub sections: Vec<LabelSection>,
}

impl RunReport {
    pub fn section(&self, label: EmergenceLabel) -> Option<&LabelSection> {
        self.sections.iter().find(|s| s.label == Some(label))
    }

    /// The section of a run without label filtering
    pub fn unfiltered(&self) -> Option<&LabelSection> {
        self.sections.iter().find(|s| s.label.is_none())
    }

    /// Every result in section, group, term order
    pub fn results(&self) -> impl Iterator<Item = &ForecastResult> {
        self.sections
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.results.iter())
    }

    pub fn completed(&self) -> usize {
        self.results().filter(|r| r.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results().filter(|r| !r.is_completed()).count()
    }
}

//! Run configuration, validated before any fitting starts

use crate::error::ConfigurationError;
use crate::evaluation::HarnessOptions;
use crate::models::EmergenceLabel;
use crate::predictor::PredictorSpec;
use crate::series::DEFAULT_MIN_PER_BUCKET;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEPS_AHEAD: usize = 5;
pub const DEFAULT_NTERMS: usize = 25;

/// Unvalidated run request, as supplied by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Predictor names, aliases, or numeric codes
    pub predictors: Vec<String>,
    /// Terms to evaluate; every extracted term when absent
    pub terms: Option<Vec<String>>,
    /// Emergence labels to report on; empty skips label filtering
    pub emergence: Vec<String>,
    pub normalized: bool,
    pub train_test: bool,
    pub curves: bool,
    pub steps_ahead: usize,
    pub min_per_bucket: u64,
    pub nterms: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            predictors: vec!["Linear".to_string()],
            terms: None,
            emergence: vec![EmergenceLabel::Emergent.to_string()],
            normalized: false,
            train_test: false,
            curves: false,
            steps_ahead: DEFAULT_STEPS_AHEAD,
            min_per_bucket: DEFAULT_MIN_PER_BUCKET,
            nterms: DEFAULT_NTERMS,
        }
    }
}

/// Immutable, validated run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    predictors: Vec<PredictorSpec>,
    terms: Option<Vec<String>>,
    labels: Vec<EmergenceLabel>,
    normalized: bool,
    train_test: bool,
    curves: bool,
    horizon: usize,
    min_per_bucket: u64,
    nterms: usize,
}

impl EvaluationRun {
    pub fn new(settings: &RunSettings) -> Result<Self, ConfigurationError> {
        let predictors = PredictorSpec::resolve_many(&settings.predictors)?;

        let mut labels = Vec::new();
        for raw in &settings.emergence {
            let label: EmergenceLabel = raw.parse()?;
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        let terms = match &settings.terms {
            Some(raw) => {
                let mut terms: Vec<String> = Vec::with_capacity(raw.len());
                for term in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                    if !terms.iter().any(|t| t == term) {
                        terms.push(term.to_string());
                    }
                }
                if terms.is_empty() {
                    return Err(ConfigurationError::invalid("terms", "term set is empty"));
                }
                Some(terms)
            }
            None => None,
        };

        if settings.steps_ahead == 0 {
            return Err(ConfigurationError::invalid(
                "steps_ahead",
                "forecast horizon must be at least 1",
            ));
        }
        if settings.nterms == 0 {
            return Err(ConfigurationError::invalid(
                "nterms",
                "at least one term per label is required",
            ));
        }

        Ok(Self {
            predictors,
            terms,
            labels,
            normalized: settings.normalized,
            train_test: settings.train_test,
            curves: settings.curves,
            horizon: settings.steps_ahead,
            min_per_bucket: settings.min_per_bucket,
            nterms: settings.nterms,
        })
    }

    pub fn predictors(&self) -> &[PredictorSpec] {
        &self.predictors
    }

    /// Explicit term set, in the order given
    pub fn terms(&self) -> Option<&[String]> {
        self.terms.as_deref()
    }

    /// Empty when terms are not filtered by emergence label
    pub fn labels(&self) -> &[EmergenceLabel] {
        &self.labels
    }

    pub fn is_label_filtered(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn normalized(&self) -> bool {
        self.normalized
    }

    pub fn train_test(&self) -> bool {
        self.train_test
    }

    pub fn curves(&self) -> bool {
        self.curves
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn min_per_bucket(&self) -> u64 {
        self.min_per_bucket
    }

    pub fn nterms(&self) -> usize {
        self.nterms
    }

    pub fn harness_options(&self, seed: u64) -> HarnessOptions {
        HarnessOptions {
            horizon: self.horizon,
            train_test: self.train_test,
            curves: self.curves,
            seed,
        }
    }
}

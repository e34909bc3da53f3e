//! Term-count matrix handed over by the extraction stage

use super::Quarter;
use crate::error::MatrixError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Per-quarter counts for one term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCounts {
    pub term: String,
    pub counts: Vec<u64>,
}

/// A single dated observation, e.g. one document mentioning a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedCount {
    pub term: String,
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Deserialize)]
struct RawMatrix {
    quarters: Vec<Quarter>,
    #[serde(default)]
    totals: Option<Vec<u64>>,
    terms: Vec<TermCounts>,
}

/// Terms × quarters matrix of non-negative counts
///
/// Quarters are contiguous and strictly increasing; every row has one count
/// per quarter. `totals`, when present, is the corpus activity per quarter
/// (e.g. number of documents) used as the normalization denominator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct TermCountMatrix {
    quarters: Vec<Quarter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    totals: Option<Vec<u64>>,
    terms: Vec<TermCounts>,
}

impl TryFrom<RawMatrix> for TermCountMatrix {
    type Error = MatrixError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Self::new(raw.quarters, raw.terms, raw.totals)
    }
}

impl TermCountMatrix {
    pub fn new(
        quarters: Vec<Quarter>,
        terms: Vec<TermCounts>,
        totals: Option<Vec<u64>>,
    ) -> Result<Self, MatrixError> {
        if quarters.is_empty() {
            return Err(MatrixError::Empty);
        }
        for pair in quarters.windows(2) {
            if pair[1] != pair[0].succ() {
                return Err(MatrixError::NonContiguousQuarters {
                    previous: pair[0].to_string(),
                    next: pair[1].to_string(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(terms.len());
        for row in &terms {
            if row.counts.len() != quarters.len() {
                return Err(MatrixError::RaggedRow {
                    term: row.term.clone(),
                    expected: quarters.len(),
                    actual: row.counts.len(),
                });
            }
            if !seen.insert(row.term.as_str()) {
                return Err(MatrixError::DuplicateTerm(row.term.clone()));
            }
        }

        if let Some(totals) = &totals {
            if totals.len() != quarters.len() {
                return Err(MatrixError::RaggedTotals {
                    expected: quarters.len(),
                    actual: totals.len(),
                });
            }
        }

        Ok(Self {
            quarters,
            totals,
            terms,
        })
    }

    /// Build a matrix from dated counts, bucketing by quarter
    ///
    /// The quarter range spans the earliest to the latest date; quarters
    /// without observations are filled with zero. Terms are ordered by name.
    pub fn from_dated_counts<I>(records: I) -> Result<Self, MatrixError>
    where
        I: IntoIterator<Item = DatedCount>,
    {
        let mut buckets: BTreeMap<String, BTreeMap<Quarter, u64>> = BTreeMap::new();
        let mut first: Option<Quarter> = None;
        let mut last: Option<Quarter> = None;

        for record in records {
            let quarter = Quarter::from_date(record.date);
            first = Some(first.map_or(quarter, |q| q.min(quarter)));
            last = Some(last.map_or(quarter, |q| q.max(quarter)));
            let count = buckets
                .entry(record.term)
                .or_default()
                .entry(quarter)
                .or_insert(0);
            *count = count.saturating_add(record.count);
        }

        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(MatrixError::Empty),
        };

        let span = last.since(first) as usize + 1;
        let quarters: Vec<Quarter> = (0..span).map(|i| first.offset(i)).collect();
        let terms = buckets
            .into_iter()
            .map(|(term, by_quarter)| TermCounts {
                term,
                counts: quarters
                    .iter()
                    .map(|q| by_quarter.get(q).copied().unwrap_or(0))
                    .collect(),
            })
            .collect();

        Self::new(quarters, terms, None)
    }

    pub fn with_totals(mut self, totals: Vec<u64>) -> Result<Self, MatrixError> {
        if totals.len() != self.quarters.len() {
            return Err(MatrixError::RaggedTotals {
                expected: self.quarters.len(),
                actual: totals.len(),
            });
        }
        self.totals = Some(totals);
        Ok(self)
    }

    pub fn quarters(&self) -> &[Quarter] {
        &self.quarters
    }

    pub fn terms(&self) -> &[TermCounts] {
        &self.terms
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Corpus activity per quarter: explicit totals, or column sums
    pub fn bucket_totals(&self) -> Vec<u64> {
        if let Some(totals) = &self.totals {
            return totals.clone();
        }
        let mut sums = vec![0u64; self.quarters.len()];
        for row in &self.terms {
            for (sum, count) in sums.iter_mut().zip(&row.counts) {
                *sum = sum.saturating_add(*count);
            }
        }
        sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quarter {
        s.parse().unwrap()
    }

    fn row(term: &str, counts: &[u64]) -> TermCounts {
        TermCounts {
            term: term.to_string(),
            counts: counts.to_vec(),
        }
    }

    #[test]
    fn test_rejects_gaps() {
        let err = TermCountMatrix::new(vec![q("2015Q1"), q("2015Q3")], vec![], None).unwrap_err();
        assert!(matches!(err, MatrixError::NonContiguousQuarters { .. }));
    }

    #[test]
    fn test_rejects_ragged_and_duplicate_rows() {
        let quarters = vec![q("2015Q1"), q("2015Q2")];
        let err = TermCountMatrix::new(quarters.clone(), vec![row("a", &[1])], None).unwrap_err();
        assert!(matches!(err, MatrixError::RaggedRow { .. }));

        let err = TermCountMatrix::new(
            quarters.clone(),
            vec![row("a", &[1, 2]), row("a", &[3, 4])],
            None,
        )
        .unwrap_err();
        assert_eq!(err, MatrixError::DuplicateTerm("a".to_string()));

        let err = TermCountMatrix::new(quarters, vec![row("a", &[1, 2])], Some(vec![1])).unwrap_err();
        assert!(matches!(err, MatrixError::RaggedTotals { .. }));
    }

    #[test]
    fn test_bucket_totals_default_to_column_sums() {
        let matrix = TermCountMatrix::new(
            vec![q("2015Q1"), q("2015Q2")],
            vec![row("a", &[1, 2]), row("b", &[3, 0])],
            None,
        )
        .unwrap();
        assert_eq!(matrix.bucket_totals(), vec![4, 2]);

        let matrix = matrix.with_totals(vec![10, 20]).unwrap();
        assert_eq!(matrix.bucket_totals(), vec![10, 20]);
    }

    #[test]
    fn test_from_dated_counts_fills_missing_quarters() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let records = vec![
            DatedCount { term: "fuel cell".into(), date: date(2015, 1, 5), count: 2 },
            DatedCount { term: "fuel cell".into(), date: date(2015, 2, 9), count: 1 },
            DatedCount { term: "battery".into(), date: date(2015, 11, 30), count: 4 },
        ];
        let matrix = TermCountMatrix::from_dated_counts(records).unwrap();

        assert_eq!(
            matrix.quarters(),
            &[q("2015Q1"), q("2015Q2"), q("2015Q3"), q("2015Q4")]
        );
        assert_eq!(matrix.terms()[0], row("battery", &[0, 0, 0, 4]));
        assert_eq!(matrix.terms()[1], row("fuel cell", &[3, 0, 0, 0]));
    }

    #[test]
    fn test_from_dated_counts_saturates() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let records = vec![
            DatedCount { term: "hype".into(), date, count: u64::MAX - 1 },
            DatedCount { term: "hype".into(), date, count: 5 },
        ];
        let matrix = TermCountMatrix::from_dated_counts(records).unwrap();
        assert_eq!(matrix.terms()[0].counts, vec![u64::MAX]);
    }

    #[test]
    fn test_from_dated_counts_empty() {
        assert_eq!(
            TermCountMatrix::from_dated_counts(Vec::new()).unwrap_err(),
            MatrixError::Empty
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"quarters": ["2015Q1", "2015Q2"], "terms": [{"term": "a", "counts": [1, 2]}]}"#;
        let matrix: TermCountMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(matrix.num_terms(), 1);

        let bad = r#"{"quarters": ["2015Q1", "2016Q2"], "terms": []}"#;
        assert!(serde_json::from_str::<TermCountMatrix>(bad).is_err());
    }
}

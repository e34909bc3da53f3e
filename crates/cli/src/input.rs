//! Term-count matrix loaders
//!
//! `.csv` files hold `term,date,count` records; anything else is read as the
//! JSON wide matrix.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use emtech_lib::series::DatedCount;
use emtech_lib::{MatrixError, TermCountMatrix};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    term: String,
    date: String,
    count: u64,
}

pub fn load_matrix(path: &Path) -> Result<TermCountMatrix> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        read_csv(file).with_context(|| format!("Failed to read CSV counts from {}", path.display()))
    } else {
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse matrix JSON from {}", path.display()))
    }
}

fn read_csv<R: std::io::Read>(reader: R) -> Result<TermCountMatrix> {
    let mut records = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: CsvRecord = row?;
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d")
            .map_err(|_| MatrixError::InvalidDate(row.date.clone()))?;
        records.push(DatedCount {
            term: row.term,
            date,
            count: row.count,
        });
    }
    Ok(TermCountMatrix::from_dated_counts(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_matrix() {
        let file = write_temp(
            ".json",
            r#"{"quarters": ["2019Q4", "2020Q1"], "terms": [{"term": "drone", "counts": [3, 9]}]}"#,
        );
        let matrix = load_matrix(file.path()).unwrap();
        assert_eq!(matrix.num_terms(), 1);
        assert_eq!(matrix.quarters().len(), 2);
    }

    #[test]
    fn test_load_csv_records() {
        let file = write_temp(
            ".csv",
            "term,date,count\ndrone,2019-11-02,3\ndrone,2020-05-20,4\nlidar,2020-01-15,1\n",
        );
        let matrix = load_matrix(file.path()).unwrap();
        assert_eq!(matrix.quarters().len(), 3);
        assert_eq!(matrix.terms()[0].term, "drone");
        assert_eq!(matrix.terms()[0].counts, vec![3, 0, 4]);
    }

    #[test]
    fn test_bad_date_rejected() {
        let file = write_temp(".csv", "term,date,count\ndrone,02/11/2019,3\n");
        let err = load_matrix(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid date"));
    }
}
